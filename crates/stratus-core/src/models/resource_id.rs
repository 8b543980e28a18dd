use rand::distr::Alphanumeric;
use rand::Rng;

const ID_SUFFIX_LEN: usize = 16;

/// Generate a resource id of the form `{kind}-{16 alphanumerics}`, e.g. `cv-3bN1x9QeTmd0LwZc`.
pub fn new_resource_id(kind: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", kind, suffix)
}

/// Swap the kind prefix of an id, keeping its suffix: `cv-abc` -> `ia-abc`.
pub fn convert_id(id: &str, kind: &str) -> String {
    match id.split_once('-') {
        Some((_, suffix)) => format!("{}-{}", kind, suffix),
        None => format!("{}-{}", kind, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resource_id_shape() {
        let id = new_resource_id("cv");
        assert!(id.starts_with("cv-"));
        assert_eq!(id.len(), 3 + ID_SUFFIX_LEN);
        assert!(id[3..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_resource_id("cv"));
    }

    #[test]
    fn test_convert_id() {
        assert_eq!(convert_id("cv-abc123", "ia"), "ia-abc123");
        assert_eq!(convert_id("abc123", "ia"), "ia-abc123");
    }
}
