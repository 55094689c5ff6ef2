use chrono::{Datelike, NaiveDate, Weekday};

pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// Spanish initials for Monday..Friday. Tuesday and Wednesday are both "M";
/// report columns are addressed by position, not by letter.
pub fn weekday_initial(wd: Weekday) -> Option<&'static str> {
    match wd {
        Weekday::Mon => Some("L"),
        Weekday::Tue => Some("M"),
        Weekday::Wed => Some("M"),
        Weekday::Thu => Some("J"),
        Weekday::Fri => Some("V"),
        Weekday::Sat | Weekday::Sun => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessDay {
    pub date: NaiveDate,
    pub initial: &'static str,
}

impl BusinessDay {
    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// Monday–Friday dates of a month, ascending. Empty for an invalid month.
pub fn business_days(year: i32, month: u32) -> Vec<BusinessDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter_map(|date| {
            weekday_initial(date.weekday()).map(|initial| BusinessDay { date, initial })
        })
        .collect()
}

/// Half-away-from-zero rounding to one decimal.
pub fn round_1_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Share of business days present, as a one-decimal percentage. A month
/// without business days reports 0.0.
pub fn attendance_percent(present: usize, business_days: usize) -> f64 {
    if business_days == 0 {
        return 0.0;
    }
    round_1_decimal(present as f64 / business_days as f64 * 100.0)
}
