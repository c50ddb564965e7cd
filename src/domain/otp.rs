// One-time code entry: six single-digit cells with a focus cursor

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpKey {
    Char(char),
    Backspace,
    ArrowLeft,
    ArrowRight,
    Paste(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// At least one cell changed.
    Changed,
    /// Only the focus moved.
    Moved,
    /// Nothing happened.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpEntry {
    cells: [Option<u8>; OTP_LENGTH],
    focus: usize,
}

impl OtpEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn cell(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied().flatten()
    }

    /// Concatenation of the filled cells, in order.
    pub fn code(&self) -> String {
        self.cells
            .iter()
            .flatten()
            .map(|d| char::from(b'0' + d))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn focus_cell(&mut self, index: usize) {
        self.focus = index.min(OTP_LENGTH - 1);
    }

    pub fn clear(&mut self) {
        self.cells = [None; OTP_LENGTH];
        self.focus = 0;
    }

    /// Fill cells from a server-supplied code. Codes longer than the entry, or
    /// containing anything but digits, are ignored entirely.
    pub fn prefill(&mut self, code: &str) -> bool {
        if code.is_empty()
            || code.chars().count() > OTP_LENGTH
            || !code.chars().all(|c| c.is_ascii_digit())
        {
            return false;
        }
        for (i, c) in code.chars().enumerate() {
            self.cells[i] = c.to_digit(10).map(|d| d as u8);
        }
        self.focus = self.next_empty_from(code.chars().count());
        true
    }

    pub fn press(&mut self, key: OtpKey) -> KeyOutcome {
        match key {
            OtpKey::Char(c) => match c.to_digit(10) {
                Some(d) if c.is_ascii_digit() => {
                    self.cells[self.focus] = Some(d as u8);
                    self.focus = (self.focus + 1).min(OTP_LENGTH - 1);
                    KeyOutcome::Changed
                }
                _ => KeyOutcome::Ignored,
            },
            OtpKey::Backspace => {
                if self.cells[self.focus].is_some() {
                    self.cells[self.focus] = None;
                    KeyOutcome::Changed
                } else if self.focus > 0 {
                    self.focus -= 1;
                    self.cells[self.focus] = None;
                    KeyOutcome::Changed
                } else {
                    KeyOutcome::Ignored
                }
            }
            OtpKey::ArrowLeft if self.focus > 0 => {
                self.focus -= 1;
                KeyOutcome::Moved
            }
            OtpKey::ArrowRight if self.focus < OTP_LENGTH - 1 => {
                self.focus += 1;
                KeyOutcome::Moved
            }
            OtpKey::ArrowLeft | OtpKey::ArrowRight => KeyOutcome::Ignored,
            OtpKey::Paste(text) => self.paste(&text),
        }
    }

    fn paste(&mut self, text: &str) -> KeyOutcome {
        let digits: Vec<u8> = text
            .chars()
            .filter(|c| c.is_ascii_digit())
            .filter_map(|c| c.to_digit(10))
            .map(|d| d as u8)
            .take(OTP_LENGTH)
            .collect();
        if digits.is_empty() {
            return KeyOutcome::Ignored;
        }

        let start = self.focus;
        let mut written = 0;
        for (slot, digit) in self.cells[start..].iter_mut().zip(digits) {
            *slot = Some(digit);
            written += 1;
        }
        self.focus = self.next_empty_from(start + written);
        KeyOutcome::Changed
    }

    fn next_empty_from(&self, index: usize) -> usize {
        (index..OTP_LENGTH)
            .find(|&i| self.cells[i].is_none())
            .unwrap_or(OTP_LENGTH - 1)
    }
}
