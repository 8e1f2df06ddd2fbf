//! Name sanitization for folder display names, file names, and folder paths.
//!
//! Every function here is total, deterministic and idempotent:
//! `sanitize(sanitize(x)) == sanitize(x)`.

use std::fmt;

/// Returned by [`sanitize_display`] when nothing usable remains.
pub const FALLBACK_DISPLAY: &str = "Unnamed";

/// Returned by [`sanitize_filename`] when nothing usable remains.
pub const FALLBACK_FILENAME: &str = "unnamed";

/// Maximum length, in characters, of a sanitized file name component.
pub const MAX_FILENAME_LEN: usize = 80;

/// Leading folder segments that carry no meaning (PST root folder names).
/// Compared case-insensitively against the whole trimmed segment.
pub const NOISE_ROOTS: [&str; 5] = [
    "outlook veri dosyasının en üstü",
    "veri",
    "top of outlook data file",
    "top of personal folders",
    "root - mailbox",
];

/// Sanitize a string for use as a folder or display name.
///
/// Keeps letters and digits (any script), space, `-`, `_` and `.`; trims the
/// result and falls back to [`FALLBACK_DISPLAY`] when it is empty.
pub fn sanitize_display(s: &str) -> String {
    let kept: String = s
        .chars()
        .filter(|&c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_DISPLAY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize a string for use as a file name component.
///
/// Keeps letters, digits, `-`, `_` and `.` (no spaces), truncates to
/// [`MAX_FILENAME_LEN`] characters and falls back to [`FALLBACK_FILENAME`].
pub fn sanitize_filename(s: &str) -> String {
    let kept: String = s
        .chars()
        .filter(|&c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(MAX_FILENAME_LEN)
        .collect();
    if kept.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        kept
    }
}

/// `true` if `segment` is one of the [`NOISE_ROOTS`].
pub fn is_noise_root(segment: &str) -> bool {
    let lowered = segment.trim().to_lowercase();
    NOISE_ROOTS.iter().any(|root| *root == lowered)
}

/// A sanitized folder path: an ordered list of display-safe segments.
///
/// An empty path denotes the container root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Sanitize an original slash-delimited folder string.
    ///
    /// Surrounding slashes are ignored, a leading noise-root segment is
    /// dropped, and every remaining segment goes through
    /// [`sanitize_display`]. Empty inner segments become
    /// [`FALLBACK_DISPLAY`] so the depth of the hierarchy is kept.
    pub fn from_original(folder: &str) -> Self {
        let trimmed = folder.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Self::default();
        }

        let mut parts: Vec<&str> = trimmed.split('/').map(str::trim).collect();
        if parts.first().is_some_and(|first| is_noise_root(first)) {
            parts.remove(0);
        }

        Self {
            segments: parts.into_iter().map(sanitize_display).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Case-insensitive lookup key. Segments cannot contain `/` once
    /// sanitized, so the joined form is unambiguous.
    pub fn key(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Collapse the path into a single file name component
    /// (`Inbox/Projects` → `Inbox_Projects`, root → `root`).
    pub fn flattened(&self) -> String {
        if self.is_root() {
            return "root".to_string();
        }
        sanitize_filename(&self.segments.join("_"))
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_display_keeps_unicode() {
        assert_eq!(sanitize_display("Gelen Kutusu"), "Gelen Kutusu");
        assert_eq!(sanitize_display("Müşteriler/Önemli"), "MüşterilerÖnemli");
        assert_eq!(sanitize_display("  Proje: A!  "), "Proje A");
        assert_eq!(sanitize_display("alice@example.com"), "aliceexample.com");
    }

    #[test]
    fn test_sanitize_display_fallback() {
        assert_eq!(sanitize_display("***"), FALLBACK_DISPLAY);
        assert_eq!(sanitize_display(""), FALLBACK_DISPLAY);
        assert_eq!(sanitize_display("   "), FALLBACK_DISPLAY);
    }

    #[test]
    fn test_sanitize_filename_rules() {
        assert_eq!(sanitize_filename("hello world"), "helloworld");
        assert_eq!(sanitize_filename("user@example.com"), "userexample.com");
        assert_eq!(sanitize_filename("a/b\\c:d*e"), "abcde");
        assert_eq!(sanitize_filename("***"), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILENAME_LEN);
        let wide = "ş".repeat(100);
        assert_eq!(sanitize_filename(&wide).chars().count(), MAX_FILENAME_LEN);
    }

    #[test]
    fn test_sanitizers_are_idempotent() {
        let inputs = [
            "",
            "***",
            "  spaced out  ",
            "Gelen Kutusu/Projeler",
            "<weird>|name?.txt",
            "İstanbul Ofisi - 2024",
            &"z".repeat(150),
        ];
        for input in inputs {
            let d = sanitize_display(input);
            assert_eq!(sanitize_display(&d), d, "display not idempotent for {input:?}");
            let f = sanitize_filename(input);
            assert_eq!(sanitize_filename(&f), f, "filename not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_folder_path_strips_noise_root() {
        let path = FolderPath::from_original("veri/Inbox/2024");
        assert_eq!(path.to_string(), "Inbox/2024");

        let path = FolderPath::from_original("Outlook veri dosyasının en üstü/Gelen Kutusu/Projeler");
        assert_eq!(path.segments(), ["Gelen Kutusu", "Projeler"]);

        let path = FolderPath::from_original("TOP OF PERSONAL FOLDERS/Inbox");
        assert_eq!(path.to_string(), "Inbox");
    }

    #[test]
    fn test_folder_path_only_strips_leading_noise() {
        let path = FolderPath::from_original("Inbox/veri");
        assert_eq!(path.segments(), ["Inbox", "veri"]);
    }

    #[test]
    fn test_folder_path_keeps_depth_for_empty_segments() {
        let path = FolderPath::from_original("Inbox//***/Archive");
        assert_eq!(
            path.segments(),
            ["Inbox", FALLBACK_DISPLAY, FALLBACK_DISPLAY, "Archive"]
        );
    }

    #[test]
    fn test_folder_path_root() {
        assert!(FolderPath::from_original("").is_root());
        assert!(FolderPath::from_original("  / ").is_root());
        assert!(FolderPath::from_original("veri").is_root());
        assert_eq!(FolderPath::default().flattened(), "root");
    }

    #[test]
    fn test_folder_path_key_is_case_insensitive() {
        let a = FolderPath::from_original("Inbox/Projects");
        let b = FolderPath::from_original("INBOX/projects");
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_folder_path_flattened() {
        let path = FolderPath::from_original("Gelen Kutusu/Projeler/Proje A");
        assert_eq!(path.flattened(), "GelenKutusu_Projeler_ProjeA");
    }
}
