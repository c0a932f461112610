pub mod image_registration;
