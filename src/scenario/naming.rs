use rand::distributions::Alphanumeric;
use rand::Rng;

const UNIQUE_ID_LEN: usize = 6;

/// Short random id, lowercase so it is valid in every AWS resource name.
pub fn unique_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNIQUE_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub fn unique_name_prefix(base: &str) -> String {
    format!("{}-{}", base, unique_id())
}
