use std::path::{Path, PathBuf};

const MAX_STEM_LEN: usize = 100;
const DEFAULT_EXTENSION: &str = "bin";

/// Characters that are unsafe in file names on at least one platform.
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '.', ' '];

/// Destination for the source at `index` of a post's source list:
/// `<downloads>/<author_id>/<stem>[_(n)].<ext>`.
///
/// `index` is the position in the full source list, not in the missing
/// queue, so a file keeps its name no matter which run downloads it.
///
/// The name depends only on the author, description and index. Two posts of
/// one author with the same description (including two without one, which
/// both use the `post` stem) map to the same path; the later download
/// overwrites the earlier file while both Media rows point at it.
pub fn media_path(
    downloads_dir: &Path,
    author_id: &str,
    description: &str,
    source_url: &str,
    index: usize,
) -> PathBuf {
    let mut name = file_stem(description);
    if name.is_empty() {
        name.push_str("post");
    }
    if index > 0 {
        name.push_str(&format!("_({})", index + 1));
    }
    name.push('.');
    name.push_str(&extension(source_url));

    downloads_dir.join(author_id).join(name)
}

/// Sanitized, percent-encoded and length-capped form of a post description.
pub fn file_stem(description: &str) -> String {
    let sanitized: String = description
        .chars()
        .map(|c| if RESERVED.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let encoded = urlencoding::encode(&sanitized).into_owned();
    truncate_encoded(&encoded, MAX_STEM_LEN).to_string()
}

/// Cut a percent-encoded ASCII string to at most `max` bytes without
/// splitting a `%XX` escape.
fn truncate_encoded(encoded: &str, max: usize) -> &str {
    if encoded.len() <= max {
        return encoded;
    }
    let mut end = max;
    if let Some(pct) = encoded[..end].rfind('%') {
        if pct + 3 > end {
            end = pct;
        }
    }
    &encoded[..end]
}

fn extension(source_url: &str) -> String {
    let path = url::Url::parse(source_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| source_url.to_string());

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_become_underscores() {
        assert_eq!(file_stem("a/b c.d"), "a_b_c_d");
        assert_eq!(file_stem(r#"what? "yes" <no> |x|"#), "what___yes___no___x_");
    }

    #[test]
    fn non_ascii_is_percent_encoded() {
        assert_eq!(file_stem("café"), "caf%C3%A9");
    }

    #[test]
    fn long_descriptions_are_capped_without_splitting_escapes() {
        let stem = file_stem(&"x".repeat(250));
        assert_eq!(stem.len(), MAX_STEM_LEN);

        let stem = file_stem(&format!("{}é", "x".repeat(98)));
        assert_eq!(stem, "x".repeat(98));
    }

    #[test]
    fn first_source_has_no_suffix() {
        let path = media_path(
            Path::new("downloads"),
            "alice",
            "beach day",
            "https://cdn/files/photo.JPG?sig=1",
            0,
        );
        assert_eq!(path, PathBuf::from("downloads/alice/beach_day.jpg"));
    }

    #[test]
    fn later_sources_get_one_based_suffix() {
        let path = media_path(Path::new("downloads"), "alice", "beach day", "https://cdn/b.mp4", 2);
        assert_eq!(path, PathBuf::from("downloads/alice/beach_day_(3).mp4"));
    }

    #[test]
    fn missing_extension_falls_back() {
        assert_eq!(extension("https://cdn/files/blob"), "bin");
        assert_eq!(extension("https://cdn/files.d/blob"), "bin");
        assert_eq!(extension("https://cdn/a.webp"), "webp");
    }

    #[test]
    fn empty_description_still_names_the_file() {
        let path = media_path(Path::new("d"), "alice", "", "https://cdn/a.png", 0);
        assert_eq!(path, PathBuf::from("d/alice/post.png"));
    }
}
