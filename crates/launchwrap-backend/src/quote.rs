/// Quote a value for a shell-visible argument string such as `exec.args`.
///
/// Values containing a space or a double quote are wrapped in double quotes
/// with `\` and `"` escaped. Anything else stays bare, with `"` and `'`
/// escaped.
pub fn quote(value: &str) -> String {
    if value.contains(' ') || value.contains('"') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.replace('"', "\\\"").replace('\'', "\\'")
    }
}

/// An ordered group of quoted parts, rendered as one space-separated value.
///
/// Each group is built fresh for the argument it ends up in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotedGroup {
    parts: Vec<String>,
}

impl QuotedGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: &str) {
        self.parts.push(quote(value));
    }

    pub fn with(mut self, value: &str) -> Self {
        self.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The joined parts, or `None` for an empty group.
    pub fn joined(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.parts.join(" "))
    }

    /// `prefix` followed by the joined parts, or `None` for an empty group.
    pub fn prefixed(&self, prefix: &str) -> Option<String> {
        self.joined().map(|joined| format!("{prefix}{joined}"))
    }
}

impl<'a> Extend<&'a str> for QuotedGroup {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a> Extend<&'a String> for QuotedGroup {
    fn extend<I: IntoIterator<Item = &'a String>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(String::as_str));
    }
}

impl<'a> FromIterator<&'a String> for QuotedGroup {
    fn from_iter<I: IntoIterator<Item = &'a String>>(iter: I) -> Self {
        let mut group = Self::new();
        group.extend(iter);
        group
    }
}
