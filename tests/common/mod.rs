//! Shared testing utilities for prebake integration tests.

use assert_cmd::Command;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const F17_DESCRIPTOR: &str = r#"<?xml version="1.0"?>
<template>
  <name>F17-x86_64-cfntools</name>
  <os>
    <name>Fedora</name>
    <version>17</version>
    <arch>x86_64</arch>
    <install type="iso">
      <iso>file:///var/lib/libvirt/images/Fedora-17-x86_64-DVD.iso</iso>
    </install>
  </os>
  <description>Fedora 17 with cfntools</description>
  <commands>
    <command name="yum-update">yum -y update</command>
  </commands>
  <files></files>
</template>
"#;

const PASSTHROUGH_VARS: &[&str] = &[
    "OS_AUTH_STRATEGY",
    "OS_AUTH_URL",
    "OS_TENANT_NAME",
    "OS_USERNAME",
    "OS_PASSWORD",
    "GLANCE_HOST",
    "GLANCE_PORT",
    "PREBAKE_DESCRIPTOR_DIR",
    "PREBAKE_IMAGE_DIR",
    "PREBAKE_BUILD_COMMAND",
    "PREBAKE_CONVERT_COMMAND",
];

/// Testing harness providing an isolated environment for CLI exercises.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new isolated environment with descriptor and image directories.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        fs::create_dir_all(root.path().join("descriptors")).expect("Failed to create descriptors");
        fs::create_dir_all(root.path().join("images")).expect("Failed to create images");
        fs::create_dir_all(root.path().join("bin")).expect("Failed to create bin");
        fs::write(root.path().join("descriptors/F17.tdl"), F17_DESCRIPTOR.replace("F17-x86_64-cfntools", "F17"))
            .expect("Failed to write descriptor");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn descriptor_dir(&self) -> PathBuf {
        self.root.path().join("descriptors")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.path().join("images")
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.path().join("converted.template")
    }

    /// Write a template file and return its path.
    pub fn write_template(&self, file_name: &str, doc: &Value) -> PathBuf {
        let path = self.root.path().join(file_name);
        fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).expect("Failed to write template");
        path
    }

    pub fn read_output(&self) -> Value {
        let content = fs::read_to_string(self.output_path()).expect("Output template should exist");
        serde_json::from_str(&content).expect("Output template should be JSON")
    }

    /// Install stand-ins for `oz-install` and `qemu-img`.
    ///
    /// The installer copies the descriptor it receives to `<image_dir>/<name>.dsk`,
    /// so the uploaded payload is the augmented descriptor text.
    #[cfg(unix)]
    pub fn install_fake_tools(&self) -> (String, String) {
        let build = self.write_script(
            "oz-install",
            &format!(
                "name=$(sed -n 's:.*<name>\\([^<]*\\)</name>.*:\\1:p' \"$4\" | head -n 1)\ncp \"$4\" '{}'/\"$name\".dsk",
                self.image_dir().display()
            ),
        );
        let convert = self.write_script("qemu-img", "cp \"$5\" \"$6\"");
        (build, convert)
    }

    #[cfg(unix)]
    fn write_script(&self, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root.path().join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\nset -e\n{}\n", body)).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod script");
        path.to_string_lossy().into_owned()
    }

    /// Build a command for invoking the compiled `prebake` binary with a clean environment.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("prebake").expect("Failed to locate prebake binary");
        cmd.current_dir(self.root.path());
        cmd.env_remove("RUST_LOG");
        for var in PASSTHROUGH_VARS {
            cmd.env_remove(var);
        }
        cmd
    }
}

/// Registry double answering the liveness probe and listing `existing` images.
#[allow(dead_code)]
pub struct FakeRegistry {
    pub server: ServerGuard,
    pub probe: Mock,
    pub list: Mock,
}

#[allow(dead_code)]
impl FakeRegistry {
    pub fn start(existing: &[(&str, &str)]) -> Self {
        let mut server = Server::new();
        let probe = server.mock("HEAD", "/v1/images/prebake-liveness-probe").with_status(404).create();

        let images: Vec<Value> = existing
            .iter()
            .map(|(id, name)| serde_json::json!({"id": id, "name": name, "size": 1}))
            .collect();
        let list = server
            .mock("GET", "/v1/images/detail")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "images": images }).to_string())
            .create();

        Self { server, probe, list }
    }

    /// Expect one upload and answer it with `id`.
    pub fn expect_upload(&mut self, name: &str, id: &str) -> Mock {
        self.server
            .mock("POST", "/v1/images")
            .match_header("x-image-meta-name", name)
            .match_header("x-image-meta-disk_format", "qcow2")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"image": {"id": id, "name": name}}).to_string())
            .expect(1)
            .create()
    }

    pub fn host(&self) -> String {
        self.server.host_with_port().split(':').next().unwrap_or("127.0.0.1").to_string()
    }

    pub fn port(&self) -> String {
        self.server.host_with_port().rsplit(':').next().unwrap_or_default().to_string()
    }
}
