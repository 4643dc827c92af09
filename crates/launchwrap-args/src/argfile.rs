/// Split the contents of an argument file into arguments.
///
/// The dialect is a small subset of shell quoting:
///
/// - whitespace separates arguments, a newline always ends one but leaves an
///   open quoted section open on the next line;
/// - `"..."` quotes, with `\"`, `\t`, `\n`, `\b` escapes inside; an escaped
///   quote never closes the quoted section;
/// - outside quotes `\` escapes the next character (`\r`, `\t`, `\b` are
///   recognized);
/// - a backslash at the end of a line continues the argument on the next
///   line, skipping the leading whitespace there; a line holding only `\`
///   cancels the continuation;
/// - `#` outside quotes starts a comment running to the end of the line.
///
/// Malformed input never fails: an unterminated quote runs to the end of the
/// text.
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::new(text).run()
}

struct Tokenizer {
    chars: Vec<char>,
    out: Vec<String>,
    buf: String,
    in_quote: bool,
    in_comment: bool,
    in_continuation: bool,
    after_newline: bool,
    /// The current argument opened a quoted section, so it is emitted even
    /// when empty (`""`).
    quoted: bool,
    /// Start of literal text not yet copied into `buf`.
    text_start: Option<usize>,
}

impl Tokenizer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            out: Vec::new(),
            buf: String::new(),
            in_quote: false,
            in_comment: false,
            in_continuation: false,
            after_newline: false,
            quoted: false,
            text_start: None,
        }
    }

    fn run(mut self) -> Vec<String> {
        let len = self.chars.len();
        let mut i = 0;
        while i < len {
            let c = self.chars[i];

            if c == '\n' {
                if self.in_continuation {
                    self.after_newline = true;
                } else {
                    self.end_argument(i);
                    if self.in_comment {
                        self.in_comment = false;
                        self.in_quote = false;
                    }
                }
                i += 1;
                continue;
            }
            if self.in_comment {
                i += 1;
                continue;
            }
            if self.in_continuation {
                if self.after_newline && c == '\\' {
                    self.after_newline = false;
                    self.in_continuation = false;
                    i += 1;
                    continue;
                }
                if c.is_whitespace() {
                    self.after_newline = false;
                    i += 1;
                    continue;
                }
                self.in_continuation = false;
                self.after_newline = false;
            }

            if self.in_quote {
                self.mark_text(i);
                self.quoted = true;
                if c == '\\' && i + 1 < len {
                    let escaped = match self.chars[i + 1] {
                        '\n' => {
                            self.flush_text(i);
                            self.in_continuation = true;
                            self.after_newline = true;
                            i += 2;
                            continue;
                        }
                        't' => '\t',
                        'n' => '\n',
                        'b' => '\u{8}',
                        // Includes `"`, which stays inside the quoted section.
                        other => other,
                    };
                    self.push_char(i, escaped);
                    i += 2;
                    continue;
                }
                if c == '"' {
                    self.flush_text(i);
                    self.in_quote = false;
                }
                i += 1;
                continue;
            }

            match c {
                '#' => {
                    self.flush_text(i);
                    self.in_comment = true;
                }
                '"' => {
                    self.flush_text(i);
                    self.in_quote = true;
                }
                '\\' => match self.chars.get(i + 1).copied() {
                    Some('\n') => {
                        // The newline itself is consumed by the next iteration.
                        self.flush_text(i);
                        self.in_continuation = true;
                    }
                    Some(next) => {
                        let escaped = match next {
                            'r' => '\r',
                            't' => '\t',
                            'b' => '\u{8}',
                            other => other,
                        };
                        self.push_char(i, escaped);
                        i += 1;
                    }
                    None => self.push_char(i, '\\'),
                },
                c if c.is_whitespace() => self.end_argument(i),
                _ => self.mark_text(i),
            }
            i += 1;
        }

        self.end_argument(len);
        self.out
    }

    fn mark_text(&mut self, at: usize) {
        if self.text_start.is_none() {
            self.text_start = Some(at);
        }
    }

    /// Copy pending literal text up to (excluding) `end` into the buffer.
    fn flush_text(&mut self, end: usize) {
        if let Some(start) = self.text_start.take() {
            if start < end {
                self.buf.extend(&self.chars[start..end]);
            }
        }
    }

    fn push_char(&mut self, at: usize, c: char) {
        self.flush_text(at);
        self.buf.push(c);
    }

    fn end_argument(&mut self, at: usize) {
        self.flush_text(at);
        if !self.buf.is_empty() || self.quoted {
            self.out.push(std::mem::take(&mut self.buf));
        }
        self.quoted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn quoted_and_escaped_space() {
        assert_eq!(tokenize(r#""a b" c\ d"#), vec!["a b", "c d"]);
    }

    #[test]
    fn simple_words_match_whitespace_split() {
        let text = "-Xmx512m  -Dfoo=bar\tcom.example.Main   one two";
        let naive: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(tokenize(text), naive);
    }

    #[test]
    fn empty_quotes_yield_empty_argument() {
        assert_eq!(tokenize("a\n\"\"\nb"), vec!["a", "", "b"]);
        assert_eq!(tokenize("   \n\t  \n"), Vec::<String>::new());
    }

    #[test]
    fn escaped_quote_does_not_close_quoting() {
        assert_eq!(tokenize(r#""say \"hi\" now" next"#), vec![r#"say "hi" now"#, "next"]);
    }

    #[test]
    fn escapes_inside_quotes() {
        assert_eq!(tokenize(r#""a\tb\nc\bd\qe""#), vec!["a\tb\nc\u{8}dqe"]);
    }

    #[test]
    fn escapes_outside_quotes() {
        assert_eq!(tokenize(r"a\tb x\rz \#not-comment"), vec!["a\tb", "x\rz", "#not-comment"]);
    }

    #[test]
    fn continuation_inside_quotes_keeps_argument_open() {
        let text = "\"-Dlong=first \\\n    second\" tail";
        assert_eq!(tokenize(text), vec!["-Dlong=first second", "tail"]);
    }

    #[test]
    fn continuation_outside_quotes_joins_lines() {
        let text = "--class-path a.jar:\\\n   b.jar\nMain";
        assert_eq!(tokenize(text), vec!["--class-path", "a.jar:b.jar", "Main"]);
    }

    #[test]
    fn lone_backslash_line_cancels_continuation() {
        let text = "first\\\n\\\nsecond";
        assert_eq!(tokenize(text), vec!["first", "second"]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let text = "# leading comment\n-ea # trailing \"quote\n\"#kept\" x#y\nz";
        assert_eq!(tokenize(text), vec!["-ea", "#kept", "x", "z"]);
    }

    #[test]
    fn quote_adjacent_to_bare_text_joins() {
        assert_eq!(tokenize(r#"-Dname="John Doe"x"#), vec!["-Dname=John Doex"]);
    }

    #[test]
    fn quote_spanning_lines_stays_open() {
        assert_eq!(tokenize("\"a b\nc d\" e"), vec!["a b", "c d", "e"]);
        assert_eq!(tokenize("\"open quote\nnext one"), vec!["open quote", "next one"]);
    }

    #[test]
    fn comment_line_resets_quoting() {
        assert_eq!(tokenize("a # \"x\nb c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn trailing_backslash_is_kept() {
        assert_eq!(tokenize("path\\"), vec!["path\\"]);
    }
}
