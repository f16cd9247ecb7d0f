//! American Soundex coding.

/// Four-character Soundex code, or `None` when `word` has no ASCII letter.
pub fn soundex(word: &str) -> Option<String> {
    let mut letters = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase());

    let first = letters.next()?;
    let mut code = String::with_capacity(4);
    code.push(first);

    let mut previous = digit(first);
    for c in letters {
        let current = digit(c);
        match current {
            Some(d) if current != previous => {
                code.push(d);
                if code.len() == 4 {
                    break;
                }
            }
            _ => {}
        }
        // 'H' and 'W' do not separate letters with the same code
        if c != 'H' && c != 'W' {
            previous = current;
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

fn digit(c: char) -> Option<char> {
    match c {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}
