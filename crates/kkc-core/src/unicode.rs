//! Character-level Unicode classification for Japanese text.

/// Check the full Hiragana block (U+3040..U+309F). This includes a few unassigned
/// codepoints (U+3040, U+3097-3098) but these never appear in conversion keys,
/// so the simpler block-level check is preferred over an exact range.
pub fn is_hiragana(c: char) -> bool {
    ('\u{3040}'..='\u{309F}').contains(&c)
}

/// Check the full Katakana block (U+30A0..U+30FF). Includes rarely-used symbols
/// (゠ U+30A0, ヿ U+30FF) but no unassigned codepoints.
pub fn is_katakana(c: char) -> bool {
    ('\u{30A0}'..='\u{30FF}').contains(&c)
}

/// Small ya/yu/yo, which only attach to an i-row consonant kana.
pub fn is_small_glide(c: char) -> bool {
    matches!(c, 'ゃ' | 'ゅ' | 'ょ')
}

/// Kana that can be followed by a small ya/yu/yo (き, し, ち, に, ...).
pub fn takes_glide(c: char) -> bool {
    matches!(
        c,
        'き' | 'ぎ'
            | 'し'
            | 'じ'
            | 'ち'
            | 'ぢ'
            | 'に'
            | 'ひ'
            | 'び'
            | 'ぴ'
            | 'み'
            | 'り'
            | 'て'
            | 'で'
            | 'ふ'
            | 'ゔ'
    )
}

/// Map a small kana to its full-size counterpart.
pub fn to_large_kana(c: char) -> char {
    match c {
        'ぁ' => 'あ',
        'ぃ' => 'い',
        'ぅ' => 'う',
        'ぇ' => 'え',
        'ぉ' => 'お',
        'ゃ' => 'や',
        'ゅ' => 'ゆ',
        'ょ' => 'よ',
        'ゎ' => 'わ',
        'っ' => 'つ',
        _ => c,
    }
}

/// Convert a hiragana string to katakana.
/// Non-hiragana characters (ー, ASCII, etc.) are passed through unchanged.
pub fn hiragana_to_katakana(s: &str) -> String {
    s.chars()
        .map(|c| {
            if ('\u{3041}'..='\u{3096}').contains(&c) {
                char::from_u32(c as u32 + 0x60).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Returns true if every character of `s` is kana or the prolonged sound mark.
pub fn is_kana_reading(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| is_hiragana(c) || is_katakana(c))
}
