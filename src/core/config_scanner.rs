/*
 * Structural classification of folders-file lines.
 *
 * The scanner knows nothing about folders: it only decides whether a line is
 * blank, a `[section]` header, a `key = value` pair or something it does not
 * understand. Turning those shapes into domain meaning (and errors) is the job
 * of the reader one layer up.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLine<'a> {
    Blank,
    // Trimmed section name; may be empty for `[]` or `[  ]`.
    Section(&'a str),
    // Trimmed key and value; either may be empty.
    KeyValue { key: &'a str, value: &'a str },
    Unknown,
}

/*
 * Classifies a single line, given without its trailing newline.
 * Section headers take precedence over key/value pairs, so `[a=b]` is a
 * section named `a=b`. Keys are not case-folded here.
 */
pub fn classify_line(line: &str) -> ConfigLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConfigLine::Blank;
    }

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return ConfigLine::Section(inner.trim());
    }

    if let Some((key, value)) = trimmed.split_once('=') {
        return ConfigLine::KeyValue {
            key: key.trim(),
            value: value.trim(),
        };
    }

    ConfigLine::Unknown
}

/*
 * A line of input paired with its 1-based number and classification.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    pub number: usize,
    pub text: &'a str,
    pub kind: ConfigLine<'a>,
}

/*
 * Iterates over the lines of an in-memory text, classifying each one.
 * Accepts `\n` and `\r\n` line endings.
 */
pub struct ConfigLineScanner<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> ConfigLineScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        ConfigLineScanner {
            lines: text.lines().enumerate(),
        }
    }
}

impl<'a> Iterator for ConfigLineScanner<'a> {
    type Item = ScannedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, text) = self.lines.next()?;
        Some(ScannedLine {
            number: index + 1,
            text,
            kind: classify_line(text),
        })
    }
}
