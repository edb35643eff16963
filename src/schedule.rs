// Decoding of the portal's compact time slot codes, e.g. `"MW 10:00-11:30"`.

/// A leading run of day letters followed by the time range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTimeSlot {
    pub days: Vec<&'static str>,
    pub time: String,
}

fn day_name(letter: char) -> Option<&'static str> {
    match letter {
        'A' => Some("SATURDAY"),
        'S' => Some("SUNDAY"),
        'M' => Some("MONDAY"),
        'T' => Some("TUESDAY"),
        'W' => Some("WEDNESDAY"),
        'R' => Some("THURSDAY"),
        _ => None,
    }
}

impl DayTimeSlot {
    /// Decode a slot code. Day letters are read until the first character
    /// that is not one; the rest, trimmed, is the time.
    pub fn decode(code: &str) -> Self {
        let mut days = Vec::new();
        let mut rest = code;
        for (i, c) in code.char_indices() {
            match day_name(c) {
                Some(name) => {
                    days.push(name);
                    rest = &code[i + c.len_utf8()..];
                }
                None => break,
            }
        }
        DayTimeSlot {
            days,
            time: rest.trim().to_string(),
        }
    }

    /// Day names joined for display, e.g. `"MONDAY, WEDNESDAY"`.
    pub fn days_label(&self) -> String {
        self.days.join(", ")
    }

    /// Days and time as one line.
    pub fn describe(&self) -> String {
        match (self.days.is_empty(), self.time.is_empty()) {
            (true, _) => self.time.clone(),
            (false, true) => self.days_label(),
            (false, false) => format!("{} {}", self.days_label(), self.time),
        }
    }
}
