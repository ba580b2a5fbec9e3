// Security module for bundle path validation
//
// This module makes sure plugin bundles are only read from the configured
// storage directory, preventing path traversal and symlink escapes.

pub mod path_validator;

pub use path_validator::{PathSecurityError, validate_bundle_path};
