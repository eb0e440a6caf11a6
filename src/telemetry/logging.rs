use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Channel {
    Error,
    Game,
    Houses,
}

impl Channel {
    const ALL: [Channel; 3] = [Channel::Error, Channel::Game, Channel::Houses];

    fn file_name(self) -> &'static str {
        match self {
            Channel::Error => "error.log",
            Channel::Game => "game.log",
            Channel::Houses => "houses.log",
        }
    }

    /// Error lines are appended bare so they stay grep-friendly.
    fn wants_header(self) -> bool {
        self != Channel::Error
    }
}

static SINKS: OnceLock<Mutex<BTreeMap<Channel, File>>> = OnceLock::new();

const RULE: &str = "-------------------------------------------------------------------------------";

/// Opens one append-only file per channel under `<root>/log`. Until this
/// runs every `log_*` call is a no-op.
pub fn init(root: &Path) -> Result<(), String> {
    if SINKS.get().is_some() {
        return Ok(());
    }
    let dir = root.join("log");
    std::fs::create_dir_all(&dir)
        .map_err(|err| format!("log directory {} create failed: {}", dir.display(), err))?;

    let now = now_seconds();
    let mut sinks = BTreeMap::new();
    for channel in Channel::ALL {
        let name = channel.file_name();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(name))
            .map_err(|err| format!("open log {} failed: {}", name, err))?;
        let fresh = file.metadata().map(|meta| meta.len() == 0).unwrap_or(false);
        if fresh && channel.wants_header() {
            let header = format!(
                "{RULE}\nTibia - House Store\n{name} - started {}\n",
                CivilTime::from_unix(now).header()
            );
            file.write_all(header.as_bytes())
                .map_err(|err| format!("header write to {} failed: {}", name, err))?;
        }
        sinks.insert(channel, file);
    }

    SINKS
        .set(Mutex::new(sinks))
        .map_err(|_| "log system already initialized".to_string())
}

pub fn log(channel: Channel, message: &str) {
    let Some(sinks) = SINKS.get() else {
        return;
    };
    let line = format!("{}: {}\n", CivilTime::from_unix(now_seconds()).stamp(), message);
    let Ok(mut sinks) = sinks.lock() else {
        return;
    };
    if let Some(file) = sinks.get_mut(&channel) {
        let _ = file.write_all(line.as_bytes()).and_then(|_| file.flush());
    }
}

pub fn log_game(message: &str) {
    log(Channel::Game, message);
}

pub fn log_error(message: &str) {
    log(Channel::Error, message);
}

pub fn log_houses(message: &str) {
    log(Channel::Houses, message);
}

fn now_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// UTC calendar breakdown of a unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CivilTime {
    year: i64,
    month: usize,
    day: i64,
    weekday: usize,
    seconds_of_day: i64,
}

impl CivilTime {
    const MONTHS: [&'static str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    const WEEKDAYS: [&'static str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

    fn from_unix(timestamp: i64) -> Self {
        let timestamp = timestamp.max(0);
        let mut days = timestamp / 86_400;
        // 1970-01-01 was a Thursday.
        let weekday = ((days + 4) % 7) as usize;

        let mut year = 1970;
        loop {
            let length = if is_leap(year) { 366 } else { 365 };
            if days < length {
                break;
            }
            days -= length;
            year += 1;
        }
        let mut month = 0;
        loop {
            let length = month_length(year, month);
            if days < length {
                break;
            }
            days -= length;
            month += 1;
        }

        Self {
            year,
            month,
            day: days + 1,
            weekday,
            seconds_of_day: timestamp % 86_400,
        }
    }

    fn clock(&self) -> (i64, i64, i64) {
        (
            self.seconds_of_day / 3_600,
            self.seconds_of_day % 3_600 / 60,
            self.seconds_of_day % 60,
        )
    }

    /// `dd.mm.yyyy hh:mm:ss`, used on every log line.
    fn stamp(&self) -> String {
        let (hour, minute, second) = self.clock();
        format!(
            "{:02}.{:02}.{} {:02}:{:02}:{:02}",
            self.day,
            self.month + 1,
            self.year,
            hour,
            minute,
            second
        )
    }

    /// ctime-style stamp for file headers.
    fn header(&self) -> String {
        let (hour, minute, second) = self.clock();
        format!(
            "{} {} {:>2} {:02}:{:02}:{:02} {}",
            Self::WEEKDAYS[self.weekday],
            Self::MONTHS[self.month],
            self.day,
            hour,
            minute,
            second,
            self.year
        )
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn month_length(year: i64, month: usize) -> i64 {
    match month {
        1 if is_leap(year) => 29,
        1 => 28,
        3 | 5 | 8 | 10 => 30,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_break_down_to_calendar_dates() {
        assert_eq!(CivilTime::from_unix(0).stamp(), "01.01.1970 00:00:00");
        assert_eq!(CivilTime::from_unix(951_782_400).stamp(), "29.02.2000 00:00:00");
        assert_eq!(CivilTime::from_unix(0).header(), "Thu Jan  1 00:00:00 1970");
        assert_eq!(
            CivilTime::from_unix(1_700_000_000).header(),
            "Tue Nov 14 22:13:20 2023"
        );
    }

    #[test]
    fn logging_before_init_is_a_no_op() {
        log_houses("not written anywhere");
        log(Channel::Error, "not written anywhere");
    }
}
