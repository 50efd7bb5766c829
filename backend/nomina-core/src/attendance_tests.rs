// src/attendance_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::*;
    use chrono::{Datelike, NaiveDate};

    // Helper to build a row with every day of the month set to the same code
    fn full_month_row(year: i32, month: u32, code: &str) -> AttendanceRow {
        let mut row = AttendanceRow::new("44556677", "Rosa Quispe", "MIGRACION");
        let mut date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        while date.month0() + 1 == month {
            row.mark(date, code);
            date = date.succ_opt().unwrap();
        }
        row
    }

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_classify_january_scenario() {
        let mut row = full_month_row(2025, 1, "A");
        row.mark(d("2025-01-15"), "T");
        row.mark(d("2025-01-20"), "FI");
        row.mark(d("2025-01-31"), "A");

        let summary = classify(&row, 2025, 1);

        assert_eq!(summary.dias_asistidos, 28, "31st must not be counted");
        assert_eq!(summary.tardanzas, 1);
        assert_eq!(summary.faltas_injustificadas, 1);
        assert_eq!(summary.faltas_justificadas, 0);
        assert_eq!(summary.dias_trabajados, 29);
    }

    #[test]
    fn test_late_is_never_counted_as_attendance() {
        let row = full_month_row(2025, 3, "T");
        let summary = classify(&row, 2025, 3);

        assert_eq!(summary.dias_asistidos, 0);
        assert_eq!(summary.tardanzas, 30);
        assert_eq!(summary.dias_trabajados, 30);
    }

    #[test]
    fn test_thirty_day_identity_holds_for_every_month_length() {
        // 28, 29, 30 and 31 day months, with absences sprinkled in
        for (year, month) in [(2025, 2), (2024, 2), (2025, 4), (2025, 7)] {
            let mut row = full_month_row(year, month, "A");
            row.mark(NaiveDate::from_ymd_opt(year, month, 3).unwrap(), "FI");
            row.mark(NaiveDate::from_ymd_opt(year, month, 4).unwrap(), "FJ");
            row.mark(NaiveDate::from_ymd_opt(year, month, 5).unwrap(), "FJ");

            let summary = classify(&row, year, month);
            assert_eq!(
                summary.dias_trabajados + summary.faltas_injustificadas + summary.faltas_justificadas,
                PAYROLL_MONTH_DAYS,
                "identity broken for {}-{:02}",
                year,
                month
            );
            assert_eq!(summary.dias_trabajados, 27);
        }
    }

    #[test]
    fn test_february_counts_only_existing_days() {
        let row = full_month_row(2025, 2, "A");
        let summary = classify(&row, 2025, 2);

        assert_eq!(summary.dias_asistidos, 28);
        assert_eq!(summary.dias_trabajados, 30);
    }

    #[test]
    fn test_columns_outside_target_month_are_ignored() {
        let mut row = AttendanceRow::new("1", "Ana", "SISTEMAS");
        row.mark(d("2024-12-30"), "FI");
        row.mark(d("2025-02-01"), "FI");
        row.mark(d("2025-01-02"), "A");

        let summary = classify(&row, 2025, 1);

        assert_eq!(summary.dias_asistidos, 1);
        assert_eq!(summary.faltas_injustificadas, 0);
    }

    #[test]
    fn test_non_date_columns_are_ignored() {
        let mut row = AttendanceRow::new("1", "Ana", "SISTEMAS");
        row.columns.insert("DNI".to_string(), "A".to_string());
        row.columns.insert("2025-1-5".to_string(), "A".to_string());
        row.columns.insert("2025-02-30".to_string(), "A".to_string());
        row.mark(d("2025-02-03"), "D");

        let summary = classify(&row, 2025, 2);

        assert_eq!(summary.dias_asistidos, 0);
        assert_eq!(summary.dias_descanso, 1);
    }

    #[test]
    fn test_codes_are_trimmed_and_case_insensitive() {
        let mut row = AttendanceRow::new("1", "Ana", "SISTEMAS");
        row.mark(d("2025-05-01"), " a ");
        row.mark(d("2025-05-02"), "fj");
        row.mark(d("2025-05-03"), "X");

        let summary = classify(&row, 2025, 5);

        assert_eq!(summary.dias_asistidos, 1);
        assert_eq!(summary.faltas_justificadas, 1);
        assert_eq!(summary.dias_trabajados, 29);
    }

    #[test]
    fn test_empty_row_works_full_period() {
        let row = AttendanceRow::new("1", "Ana", "SISTEMAS");
        assert_eq!(classify(&row, 2025, 6), AttendanceSummary::without_marks());
    }

    #[test]
    fn test_column_date_rejects_malformed_names() {
        assert_eq!(column_date("2025-01-09"), Some(d("2025-01-09")));
        assert_eq!(column_date("Campaña"), None);
        assert_eq!(column_date("2025-13-01"), None);
        assert_eq!(column_date(" 2025-01-09"), None);
    }
}
