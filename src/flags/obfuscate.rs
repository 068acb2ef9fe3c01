//! Partial masking of secret flag values for log output.

/// Characters that are never masked.
const IGNORED: [char; 1] = ['-'];

/// Mask character.
const MASK: char = 'X';

/// Number of trailing characters left visible for a value of `len` chars.
///
/// The tiers are 4 for values longer than 4, 2 for lengths 3 and 4, and 1
/// otherwise. wakatime plugins have always masked keys this way, so the
/// thresholds are kept as they are.
pub fn reveal_len(len: usize) -> usize {
    if len > 4 {
        4
    } else if len > 2 {
        2
    } else {
        1
    }
}

/// Replace every character outside the reveal window with `X`, keeping
/// dashes in place.
pub fn obfuscate(value: &str) -> String {
    let len = value.chars().count();
    let visible_from = len.saturating_sub(reveal_len(len));

    value
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i >= visible_from || IGNORED.contains(&c) {
                c
            } else {
                MASK
            }
        })
        .collect()
}
