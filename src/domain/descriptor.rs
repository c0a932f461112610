//! Build descriptor (TDL) augmentation.
//!
//! Three elements are appended to every descriptor: a post-install command,
//! the services installer script, and the instance metadata as a base64 file.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;

use crate::domain::AppError;

pub const COMMAND_NAME: &str = "prebake-services";
pub const INSTALLER_PATH: &str = "/var/lib/prebake/install-services.py";
pub const METADATA_PATH: &str = "/var/lib/prebake/metadata.json";
pub const INSTALLER_COMMAND: &str =
    "python /var/lib/prebake/install-services.py > /var/log/prebake-services.log 2>&1";

/// Loads the embedded metadata and runs the in-image services installer.
pub const INSTALLER_SCRIPT: &str = r#"#!/usr/bin/env python
import json
import sys

from heat_cfntools.cfntools import cfn_helper

with open('/var/lib/prebake/metadata.json') as metadata_file:
    metadata = cfn_helper.Metadata('prebake', None)
    metadata.retrieve(meta_data=json.load(metadata_file))
    metadata.cfn_init()

sys.exit(0)
"#;

const COMMANDS: &[u8] = b"commands";
const FILES: &[u8] = b"files";
const NAME: &[u8] = b"name";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Commands,
    Files,
}

impl Section {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            COMMANDS => Some(Section::Commands),
            FILES => Some(Section::Files),
            _ => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Section::Commands => "commands",
            Section::Files => "files",
        }
    }
}

/// Read the descriptor at `path` and return it augmented for `metadata`.
pub fn update_tdl(path: &Path, metadata: &Value) -> Result<String, AppError> {
    let source = fs::read_to_string(path)?;
    update_descriptor(&source, metadata)
        .map_err(|e| AppError::Descriptor(format!("{}: {}", path.display(), e)))
}

/// Append the command and file entries to a descriptor document.
///
/// Returns the serialized document, XML declaration included. Existing
/// same-named entries are left alone, so applying this twice duplicates them.
pub fn update_descriptor(source: &str, metadata: &Value) -> Result<String, AppError> {
    let payload = BASE64.encode(serde_json::to_vec(metadata)?);

    let mut reader = Reader::from_str(source);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut depth = 0usize;
    let mut open_section: Option<Section> = None;
    let mut seen_commands = false;
    let mut seen_files = false;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Decl(_) => {}
            Event::Start(start) => {
                if depth == 1 {
                    open_section = Section::from_tag(start.name().as_ref());
                }
                if depth == 0 {
                    saw_root = true;
                }
                depth += 1;
                write(&mut writer, Event::Start(start))?;
            }
            Event::Empty(start) => {
                let section = if depth == 1 { Section::from_tag(start.name().as_ref()) } else { None };
                match section {
                    Some(section) => {
                        mark_seen(section, &mut seen_commands, &mut seen_files);
                        write(&mut writer, Event::Start(start))?;
                        write_additions(&mut writer, section, &payload)?;
                        write(&mut writer, Event::End(BytesEnd::new(section.tag())))?;
                    }
                    None => {
                        if depth == 0 {
                            return Err(AppError::Descriptor("root element is empty".into()));
                        }
                        write(&mut writer, Event::Empty(start))?;
                    }
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some(section) = open_section.take() {
                        mark_seen(section, &mut seen_commands, &mut seen_files);
                        write_additions(&mut writer, section, &payload)?;
                    }
                } else if depth == 0 {
                    if !seen_commands {
                        write_section(&mut writer, Section::Commands, &payload)?;
                        seen_commands = true;
                    }
                    if !seen_files {
                        write_section(&mut writer, Section::Files, &payload)?;
                        seen_files = true;
                    }
                }
                write(&mut writer, Event::End(end))?;
            }
            event => write(&mut writer, event)?,
        }
    }

    if !saw_root {
        return Err(AppError::Descriptor("document has no root element".into()));
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| AppError::Descriptor(e.to_string()))
}

/// Value of the top-level `<name>` element.
pub fn descriptor_name(source: &str) -> Result<String, AppError> {
    let mut reader = Reader::from_str(source);
    let mut depth = 0usize;
    let mut in_name = false;
    let mut name = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(start) => {
                in_name = depth == 1 && start.name().as_ref() == NAME;
                depth += 1;
            }
            Event::Text(text) if in_name => {
                name.push_str(&text.unescape().map_err(xml_error)?);
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if in_name {
                    break;
                }
            }
            _ => {}
        }
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Descriptor("missing top-level <name> element".into()));
    }
    Ok(name.to_string())
}

fn mark_seen(section: Section, seen_commands: &mut bool, seen_files: &mut bool) {
    match section {
        Section::Commands => *seen_commands = true,
        Section::Files => *seen_files = true,
    }
}

fn write_section(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    section: Section,
    payload: &str,
) -> Result<(), AppError> {
    write(writer, Event::Start(BytesStart::new(section.tag())))?;
    write_additions(writer, section, payload)?;
    write(writer, Event::End(BytesEnd::new(section.tag())))
}

fn write_additions(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    section: Section,
    payload: &str,
) -> Result<(), AppError> {
    match section {
        Section::Commands => {
            write_element(writer, "command", &[("name", COMMAND_NAME)], INSTALLER_COMMAND)
        }
        Section::Files => {
            write_element(writer, "file", &[("name", INSTALLER_PATH)], INSTALLER_SCRIPT)?;
            write_element(writer, "file", &[("name", METADATA_PATH), ("type", "base64")], payload)
        }
    }
}

fn write_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    attributes: &[(&str, &str)],
    body: &str,
) -> Result<(), AppError> {
    let start = BytesStart::new(tag).with_attributes(attributes.iter().copied());
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(body)))?;
    write(writer, Event::End(BytesEnd::new(tag)))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), AppError> {
    writer.write_event(event).map_err(xml_error)
}

fn xml_error(err: impl std::fmt::Display) -> AppError {
    AppError::Descriptor(err.to_string())
}
