//! Permissive shell-style tokenizer.
//!
//! Approximates word splitting for static command inspection. Not a shell
//! grammar: no expansion, no operators, and unterminated quotes simply run to
//! the end of input.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `command` into words.
///
/// Single and double quotes group words; inside either, a backslash escapes
/// the next character. Whitespace outside quotes separates words. `''`
/// produces an empty word.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_word = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        tokens.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
            Quote::Single | Quote::Double => match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '\'' if quote == Quote::Single => quote = Quote::None,
                '"' if quote == Quote::Double => quote = Quote::None,
                c => current.push(c),
            },
        }
    }

    if in_word {
        tokens.push(current);
    }
    tokens
}
