//! Filename conventions shared by the collection editor and the sync
//! pipeline. A collection directory encodes display order and title in each
//! filename as `"{index} - {title}.{ext}"`; files without the numeric prefix
//! sort after all indexed files.

use std::cmp::Ordering;
use std::collections::HashSet;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "webp", "gif", "avif", "bmp", "tif", "tiff",
];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv", "flv", "m4v"];

/// Lowercased extension without the dot, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_image_file(file_name: &str) -> bool {
    extension_of(file_name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_video_file(file_name: &str) -> bool {
    extension_of(file_name).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_media_file(file_name: &str) -> bool {
    is_image_file(file_name) || is_video_file(file_name)
}

/// Splits a filename into its stem and extension (including the leading dot,
/// empty if there is none).
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Leading order index, absent when the filename carries no prefix.
    pub index: Option<u64>,
    pub title: String,
}

/// Parses the `"{digits} - {title}"` prefix out of a filename's stem.
/// Unprefixed files keep their full stem as the title and sort last.
pub fn parse_prefixed_name(file_name: &str) -> ParsedName {
    let (stem, _) = split_extension(file_name);

    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        let rest = stem[digits.len()..].trim_start();
        if let Some(rest) = rest.strip_prefix('-') {
            let title = rest.trim();
            if !title.is_empty()
                && let Ok(index) = digits.parse::<u64>()
            {
                return ParsedName {
                    index: Some(index),
                    title: title.to_string(),
                };
            }
        }
    }

    ParsedName {
        index: None,
        title: stem.to_string(),
    }
}

/// Case-insensitive comparison that treats digit runs as numbers, so
/// `"2 - B.png"` sorts before `"10 - A.png"`.
pub fn natural_compare(left: &str, right: &str) -> Ordering {
    let a: Vec<char> = left.to_lowercase().chars().collect();
    let b: Vec<char> = right.to_lowercase().chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let start_i = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let start_j = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let num_a: String = a[start_i..i].iter().collect();
            let num_b: String = b[start_j..j].iter().collect();
            let cmp = num_a
                .trim_start_matches('0')
                .len()
                .cmp(&num_b.trim_start_matches('0').len())
                .then_with(|| num_a.trim_start_matches('0').cmp(num_b.trim_start_matches('0')));
            if cmp != Ordering::Equal {
                return cmp;
            }
        } else {
            let cmp = a[i].cmp(&b[j]);
            if cmp != Ordering::Equal {
                return cmp;
            }
            i += 1;
            j += 1;
        }
    }

    a.len().cmp(&b.len()).then_with(|| left.cmp(right))
}

/// Canonical display order: numeric prefix first (unprefixed files last),
/// ties broken by natural filename comparison.
pub fn sort_by_index_then_name(file_names: &mut [String]) {
    file_names.sort_by(|left, right| {
        let left_index = parse_prefixed_name(left).index;
        let right_index = parse_prefixed_name(right).index;
        match (left_index, right_index) {
            (Some(a), Some(b)) if a != b => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => natural_compare(left, right),
        }
    });
}

/// Strips path separators and collapses whitespace so a title is safe to
/// embed in a filename.
pub fn sanitize_title(value: &str) -> String {
    value
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Allocates `desired` or the first free `"{stem} (2)"`-style variant,
/// recording the result in `taken`.
pub fn next_unique_name(desired: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(desired.to_string()) {
        return desired.to_string();
    }

    let (stem, ext) = split_extension(desired);
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{} ({}){}", stem, suffix, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Human title from a filename: order prefix stripped, underscores and
/// hyphens become spaces, whitespace collapsed, words title-cased.
pub fn title_from_file_name(file_name: &str) -> String {
    let parsed = parse_prefixed_name(file_name);
    let spaced: String = parsed
        .title
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();

    let title = spaced
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase slug: alphanumeric runs joined by single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;

    for c in value.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

pub fn title_from_slug(slug: &str) -> String {
    let title = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_name() {
        let parsed = parse_prefixed_name("12 - Harbor at Dusk.jpg");
        assert_eq!(parsed.index, Some(12));
        assert_eq!(parsed.title, "Harbor at Dusk");

        let parsed = parse_prefixed_name("3- tight spacing.png");
        assert_eq!(parsed.index, Some(3));
        assert_eq!(parsed.title, "tight spacing");

        let unprefixed = parse_prefixed_name("notes.png");
        assert_eq!(unprefixed.index, None);
        assert_eq!(unprefixed.title, "notes");

        // Digits without the dash separator are part of the title
        let plain = parse_prefixed_name("2024 summer.jpg");
        assert_eq!(plain.index, None);
        assert_eq!(plain.title, "2024 summer");
    }

    #[test]
    fn test_ordering_is_numeric_not_lexicographic() {
        let mut names = vec![
            "2 - B.png".to_string(),
            "10 - A.png".to_string(),
            "1 - C.png".to_string(),
            "notes.png".to_string(),
        ];
        sort_by_index_then_name(&mut names);
        assert_eq!(names, vec!["1 - C.png", "2 - B.png", "10 - A.png", "notes.png"]);
    }

    #[test]
    fn test_unindexed_files_sort_last_by_name() {
        let mut names = vec![
            "zebra.jpg".to_string(),
            "1 - first.jpg".to_string(),
            "apple.jpg".to_string(),
        ];
        sort_by_index_then_name(&mut names);
        assert_eq!(names, vec!["1 - first.jpg", "apple.jpg", "zebra.jpg"]);
    }

    #[test]
    fn test_natural_compare_digit_runs() {
        assert_eq!(natural_compare("img2", "img10"), Ordering::Less);
        assert_eq!(natural_compare("a", "b"), Ordering::Less);
        // Case only breaks ties
        assert_eq!(natural_compare("IMG2", "img2"), Ordering::Less);
        // Equal numeric value, longer zero-padded form sorts after
        assert_eq!(natural_compare("img02", "img2"), Ordering::Greater);
    }

    #[test]
    fn test_sanitize_title_strips_separators_and_whitespace() {
        assert_eq!(sanitize_title("Foo/  Bar"), "Foo Bar");
        assert_eq!(sanitize_title("back\\slash"), "back slash");
        assert_eq!(sanitize_title("  padded   out  "), "padded out");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_next_unique_name_appends_counter() {
        let mut taken = HashSet::new();
        assert_eq!(next_unique_name("1 - Dawn.jpg", &mut taken), "1 - Dawn.jpg");
        assert_eq!(next_unique_name("1 - Dawn.jpg", &mut taken), "1 - Dawn (2).jpg");
        assert_eq!(next_unique_name("1 - Dawn.jpg", &mut taken), "1 - Dawn (3).jpg");
    }

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(title_from_file_name("3 - harbor_at-dusk.jpg"), "Harbor At Dusk");
        assert_eq!(title_from_file_name("quiet__morning.png"), "Quiet Morning");
        assert_eq!(title_from_file_name("___.jpg"), "Untitled");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Street Scenes!"), "street-scenes");
        assert_eq!(slugify("  Multi --- dash  "), "multi-dash");
        assert_eq!(slugify("***"), "untitled");
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("street-scenes"), "Street Scenes");
        assert_eq!(title_from_slug(""), "Untitled");
    }

    #[test]
    fn test_media_extension_classification() {
        assert!(is_image_file("photo.JPG"));
        assert!(is_image_file("art.webp"));
        assert!(is_video_file("clip.mp4"));
        assert!(!is_media_file("readme.txt"));
        assert!(!is_media_file("no_extension"));
    }
}
