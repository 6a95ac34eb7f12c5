use rand::Rng;
use rand::distr::Alphanumeric;
use std::path::Path;

use crate::constant::SUFFIX_LEN_RANGE;

pub trait PathExt {
    fn ext_lower(&self) -> String;
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Random lowercase-alphanumeric token of 3 to 6 characters.
pub fn random_suffix() -> String {
    let length = rand::rng().random_range(SUFFIX_LEN_RANGE);
    rand::rng()
        .sample_iter(&Alphanumeric)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(length)
        .map(char::from)
        .collect()
}

/// Insert a random token between stem and extension: `clip.mp4` becomes
/// `clip_x7f2.mp4`. Extensionless names get the token appended.
pub fn suffixed_file_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, random_suffix(), ext),
        None => format!("{}_{}", stem, random_suffix()),
    }
}
