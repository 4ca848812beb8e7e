//! Text-editing primitives for WRITE mode: the alphabet ring, its control
//! glyphs, and the sentence/prefix buffer they act on.
//!
//! Every edit is total: operations on empty buffers are no-ops.

use crate::config::DEFAULT_ALPHABET;

/// What selecting a ring position does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// `_` finishes the current word
    Space,
    /// `<` removes one character
    Backspace,
    /// `[` removes the prefix, or the last committed word
    DeleteWord,
    /// `]` wipes sentence and prefix
    Clear,
    /// `.` commits and speaks the sentence
    Send,
    Letter(char),
}

impl Glyph {
    pub fn from_char(ch: char) -> Self {
        match ch {
            '_' => Glyph::Space,
            '<' => Glyph::Backspace,
            '[' => Glyph::DeleteWord,
            ']' => Glyph::Clear,
            '.' => Glyph::Send,
            other => Glyph::Letter(other),
        }
    }
}

/// The circular list of selectable characters. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Build from a string; an empty string falls back to the default ring.
    pub fn new(chars: &str) -> Self {
        let chars: Vec<char> = chars.chars().collect();
        if chars.is_empty() {
            Self::default()
        } else {
            Self { chars }
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `index`, wrapping around the ring
    pub fn char_at(&self, index: usize) -> char {
        self.chars[index % self.chars.len()]
    }

    pub fn glyph_at(&self, index: usize) -> Glyph {
        Glyph::from_char(self.char_at(index))
    }

    pub fn position(&self, ch: char) -> Option<usize> {
        self.chars.iter().position(|c| *c == ch)
    }

    /// Move `index` by `delta` steps around the ring
    pub fn step(&self, index: usize, delta: isize) -> usize {
        let len = self.chars.len() as isize;
        ((index as isize % len) + delta).rem_euclid(len) as usize
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            chars: DEFAULT_ALPHABET.chars().collect(),
        }
    }
}

/// Sentence under composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    /// Committed words, each followed by a space
    pub sentence: String,
    /// Word under construction
    pub prefix: String,
    /// Position in the alphabet ring
    pub cursor_index: usize,
    /// 0 selects the alphabet row, 1..=N a suggestion slot
    pub sugg_index: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_char(&mut self, ch: char) {
        self.prefix.push(ch);
    }

    /// Move the prefix into the sentence followed by a space
    pub fn commit_prefix(&mut self) {
        self.sentence.push_str(&self.prefix);
        self.sentence.push(' ');
        self.prefix.clear();
    }

    /// Replace the prefix with a whole word
    pub fn accept_word(&mut self, word: &str) {
        self.sentence.push_str(word);
        self.sentence.push(' ');
        self.prefix.clear();
        self.sugg_index = 0;
    }

    pub fn backspace(&mut self) {
        if self.prefix.pop().is_none() {
            self.sentence.pop();
        }
    }

    pub fn delete_word(&mut self) {
        if !self.prefix.is_empty() {
            self.prefix.clear();
            return;
        }
        let mut words: Vec<&str> = self.sentence.split_whitespace().collect();
        words.pop();
        let mut sentence = words.join(" ");
        if !sentence.is_empty() {
            sentence.push(' ');
        }
        self.sentence = sentence;
    }

    pub fn clear(&mut self) {
        self.sentence.clear();
        self.prefix.clear();
    }

    /// Commit any prefix and hand back the finished message.
    ///
    /// Returns `None`, leaving the sentence alone, when there is nothing but
    /// whitespace to say.
    pub fn take_message(&mut self) -> Option<String> {
        if !self.prefix.is_empty() {
            self.commit_prefix();
        }
        let message = self.sentence.trim();
        if message.is_empty() {
            return None;
        }
        let message = message.to_string();
        self.sentence.clear();
        self.sugg_index = 0;
        Some(message)
    }
}
