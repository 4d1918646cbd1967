//! Language-tag fallback for model replies that ignore the JSON contract.

use agromind_core::farm::DEFAULT_LANGUAGE;
use tracing::debug;

/// Detect the language of `text` and map it to one of the supported tags.
///
/// Undetectable text and languages outside the table map to `en-IN`.
pub fn detect_language_tag(text: &str) -> &'static str {
    match whatlang::detect(text) {
        Some(info) => {
            let code = info.lang().code();
            debug!(code, confidence = info.confidence(), "Detected reply language");
            tag_for_iso639_3(code)
        }
        None => DEFAULT_LANGUAGE,
    }
}

/// ISO 639-3 code → locale tag.
pub fn tag_for_iso639_3(code: &str) -> &'static str {
    match code {
        "hin" => "hi-IN",
        "ben" => "bn-IN",
        "tam" => "ta-IN",
        "tel" => "te-IN",
        "pan" => "pa-IN",
        "guj" => "gu-IN",
        "mar" => "mr-IN",
        "kan" => "kn-IN",
        "mal" => "ml-IN",
        "ory" | "ori" => "or-IN",
        "eng" => "en-IN",
        _ => DEFAULT_LANGUAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_indian_languages() {
        assert_eq!(tag_for_iso639_3("hin"), "hi-IN");
        assert_eq!(tag_for_iso639_3("pan"), "pa-IN");
        assert_eq!(tag_for_iso639_3("ori"), "or-IN");
        assert_eq!(tag_for_iso639_3("ory"), "or-IN");
        assert_eq!(tag_for_iso639_3("fra"), "en-IN");
        assert_eq!(tag_for_iso639_3(""), "en-IN");
    }

    #[test]
    fn detects_hindi() {
        let tag = detect_language_tag(
            "कल बारिश होने की संभावना है, इसलिए बुवाई को दो दिन के लिए रोक देना बेहतर होगा।",
        );
        assert_eq!(tag, "hi-IN");
    }

    #[test]
    fn detects_tamil() {
        let tag = detect_language_tag("நாளை மழை பெய்ய வாய்ப்பு உள்ளது, எனவே விதைப்பை இரண்டு நாட்கள் தள்ளி வைக்கவும்.");
        assert_eq!(tag, "ta-IN");
    }

    #[test]
    fn unmapped_language_defaults() {
        assert_eq!(detect_language_tag("Bonjour, il va pleuvoir"), "en-IN");
        assert_eq!(detect_language_tag(""), "en-IN");
    }
}
