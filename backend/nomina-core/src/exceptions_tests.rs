// src/exceptions_tests.rs

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::error::AppError;
    use crate::exceptions::*;
    use crate::sqlite_store_tests::tests::{date, seeded_store};
    use crate::store::NominaStore;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        date(2025, 1, 20)
    }

    // Helper function to create a single-day schedule override request
    fn request(dni: &str, fecha: NaiveDate) -> ExceptionRequest {
        ExceptionRequest {
            dni: dni.to_string(),
            fecha,
            fecha_fin: None,
            horario_id: Some(2),
            descanso: false,
            motivo: "Cambio de turno".to_string(),
        }
    }

    fn validation_errors(result: Result<impl std::fmt::Debug, AppError>) -> Vec<String> {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_single_day_request_expands_to_one_exception() {
        let expanded = expand_request(&request("1001", date(2025, 1, 22)), today()).unwrap();

        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].fecha, date(2025, 1, 22));
        assert_eq!(expanded[0].horario_id, Some(2));
        assert!(!expanded[0].es_descanso);
    }

    #[test]
    fn test_range_expands_to_every_day_inclusive() {
        let mut req = request("1001", date(2025, 1, 30));
        req.fecha_fin = Some(date(2025, 2, 2));

        let expanded = expand_request(&req, today()).unwrap();
        let days: Vec<NaiveDate> = expanded.iter().map(|e| e.fecha).collect();

        assert_eq!(
            days,
            vec![date(2025, 1, 30), date(2025, 1, 31), date(2025, 2, 1), date(2025, 2, 2)]
        );
    }

    #[test]
    fn test_rest_day_request_has_no_schedule() {
        let mut req = request("1001", date(2025, 1, 25));
        req.horario_id = None;
        req.descanso = true;

        let expanded = expand_request(&req, today()).unwrap();

        assert!(expanded[0].es_descanso);
        assert_eq!(expanded[0].horario_id, None);
    }

    #[test]
    fn test_all_rule_violations_are_reported_together() {
        let req = ExceptionRequest {
            dni: "1001".to_string(),
            fecha: date(2025, 1, 10),
            fecha_fin: Some(date(2025, 1, 5)),
            horario_id: None,
            descanso: false,
            motivo: "   ".to_string(),
        };

        let errors = validation_errors(expand_request(&req, today()));

        assert_eq!(errors.len(), 3, "errors: {:?}", errors);
        assert!(errors.iter().any(|e| e.contains("motivo")));
        assert!(errors.iter().any(|e| e.contains("fechaFin")));
    }

    #[test]
    fn test_schedule_and_rest_day_are_exclusive() {
        let mut req = request("1001", date(2025, 1, 25));
        req.descanso = true;

        let errors = validation_errors(expand_request(&req, today()));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_range_longer_than_31_days_is_rejected() {
        let mut req = request("1001", date(2025, 2, 1));
        req.fecha_fin = Some(date(2025, 3, 4));
        assert_eq!(validation_errors(expand_request(&req, today())).len(), 1);

        req.fecha_fin = Some(date(2025, 3, 3)); // exactly 31 days
        assert_eq!(expand_request(&req, today()).unwrap().len(), 31);
    }

    #[test]
    fn test_dates_more_than_a_month_back_are_rejected() {
        let errors = validation_errors(expand_request(&request("1001", date(2024, 12, 19)), today()));
        assert!(errors[0].contains("20/12/2024"), "errors: {:?}", errors);

        assert!(expand_request(&request("1001", date(2024, 12, 20)), today()).is_ok());
    }

    #[tokio::test]
    async fn test_create_exceptions_persists_range() {
        let store = seeded_store().await;
        let clock = FixedClock(today());
        let mut req = request("1001", date(2025, 1, 21));
        req.fecha_fin = Some(date(2025, 1, 23));

        let created = create_exceptions(&store, &clock, &req).await.unwrap();

        assert_eq!(created.len(), 3);
        assert_eq!(store.exceptions_for("1001").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_date_returns_conflict_and_keeps_existing_record() {
        let store = seeded_store().await;
        let clock = FixedClock(today());
        create_exceptions(&store, &clock, &request("1001", date(2025, 1, 25)))
            .await
            .unwrap();

        let mut second = request("1001", date(2025, 1, 24));
        second.fecha_fin = Some(date(2025, 1, 26));
        second.horario_id = Some(1);
        let result = create_exceptions(&store, &clock, &second).await;

        assert!(matches!(result, Err(AppError::Conflict(_))), "got {:?}", result);
        let existing = store.exceptions_for("1001").await.unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].fecha, date(2025, 1, 25));
        assert_eq!(existing[0].horario_id, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_employee_or_schedule_is_not_found() {
        let store = seeded_store().await;
        let clock = FixedClock(today());

        let unknown_employee = create_exceptions(&store, &clock, &request("9999", today())).await;
        assert!(matches!(unknown_employee, Err(AppError::NotFound(_))));

        let mut req = request("1001", today());
        req.horario_id = Some(42);
        let unknown_schedule = create_exceptions(&store, &clock, &req).await;
        assert!(matches!(unknown_schedule, Err(AppError::NotFound(_))));
    }
}
