//! Offline correction pass for Korean OCR output.
//!
//! Printed Hangul from scanned sources comes back with a small set of
//! recurring confusions, mostly archaic or near-identical syllable shapes.
//! The fix is a fixed substitution table; no provider call, no failure mode.

/// Misrecognized form → intended modern form.
const CORRECTIONS: &[(&str, &str)] = &[
    ("긔", "기"),
    ("릐", "의"),
    ("됴", "도"),
    ("툐", "토"),
    ("셩", "성"),
    ("졍", "정"),
    ("쳥", "청"),
    ("뎡", "정"),
    ("믈", "물"),
    ("샹", "상"),
    ("향샹", "향상"),
    ("밎", "및"),
];

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}'   // precomposed syllables
            | '\u{1100}'..='\u{11FF}' // jamo
            | '\u{3130}'..='\u{318F}' // compatibility jamo
        )
    })
}

/// Apply the substitution table. Pure local transform; callers gate on
/// `contains_hangul` so non-Korean text is passed through untouched.
pub fn correct(text: &str) -> String {
    let mut corrected = text.to_string();
    for (wrong, right) in CORRECTIONS {
        if corrected.contains(wrong) {
            corrected = corrected.replace(wrong, right);
        }
    }
    corrected
}
