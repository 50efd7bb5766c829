// src/shaping_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::{AttendanceRow, AttendanceSummary};
    use crate::payroll::{ConceptAmount, PayrollReportRow};
    use crate::shaping::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report_row(dni: &str, conceptos: Vec<ConceptAmount>) -> PayrollReportRow {
        let total_conceptos: Decimal = conceptos.iter().map(|c| c.monto).sum();
        PayrollReportRow {
            dni: dni.to_string(),
            nombre_completo: format!("Empleado {}", dni),
            campana: "MIGRACION".to_string(),
            cargo: "ASESOR".to_string(),
            fecha_ingreso: date(2023, 7, 3),
            asistencia: AttendanceSummary::without_marks(),
            sueldo_base: dec!(1234.5),
            descuento_faltas: Decimal::ZERO,
            conceptos,
            total_conceptos,
            neto_a_pagar: dec!(1234.5) + total_conceptos,
        }
    }

    fn concept(nombre: &str, monto: Decimal) -> ConceptAmount {
        ConceptAmount {
            nombre: nombre.to_string(),
            monto,
        }
    }

    #[test]
    fn test_currency_formatting() {
        assert_eq!(format_currency(dec!(1234.5)), "S/ 1,234.50");
        assert_eq!(format_currency(dec!(0)), "S/ 0.00");
        assert_eq!(format_currency(dec!(999.999)), "S/ 1,000.00");
        assert_eq!(format_currency(dec!(1234567.891)), "S/ 1,234,567.89");
        assert_eq!(format_currency(dec!(-12)), "-S/ 12.00");
        assert_eq!(format_currency(dec!(100)), "S/ 100.00");
    }

    #[test]
    fn test_date_and_period_labels() {
        assert_eq!(format_date(date(2025, 1, 5)), "05/01/2025");
        assert_eq!(period_label(2025, 1), "enero 2025");
        assert_eq!(period_label(2024, 12), "diciembre 2024");
        assert_eq!(period_label(2024, 13), "mes desconocido 2024");
    }

    #[test]
    fn test_payroll_row_uses_frontend_field_names() {
        let row = report_row("40506070", vec![concept("Bono Metas", dec!(50))]);
        let json = serde_json::to_value(payroll_view(row)).unwrap();

        assert_eq!(json["DNI"], "40506070");
        assert_eq!(json["NombreCampaña"], "MIGRACION");
        assert_eq!(json["SueldoBase"], 1234.5);
        assert_eq!(json["TotalPagar"], 1284.5);
        assert_eq!(json["diasTrabajados"], 30);
        assert_eq!(json["Conceptos"][0]["Nombre"], "Bono Metas");
        assert_eq!(json["SueldoBaseFormateado"], "S/ 1,234.50");
        assert_eq!(json["FechaIngresoFormateada"], "03/07/2023");
        assert!(json.get("NetoAPagar").is_none(), "legacy name leaked: {}", json);
        assert!(json.get("SueldoBaseMensual").is_none(), "legacy name leaked: {}", json);
    }

    #[test]
    fn test_attendance_report_classifies_each_row() {
        let mut row = AttendanceRow::new("1", "Ana Quispe", "RECLAMOS");
        row.mark(date(2025, 1, 2), "A");
        row.mark(date(2025, 1, 3), "FI");

        let report = attendance_report(&[row], 2025, 1);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].resumen.dias_asistidos, 1);
        assert_eq!(report[0].resumen.dias_trabajados, 29);
        let json = serde_json::to_value(&report[0]).unwrap();
        assert_eq!(json["NombreCampaña"], "RECLAMOS");
        assert_eq!(json["faltasInjustificadas"], 1);
    }

    #[test]
    fn test_page_size_validation() {
        for size in PAGE_SIZES {
            let request = PageRequest { pagina: 1, tamano_pagina: size };
            assert!(request.validate().is_empty(), "size {} should be accepted", size);
        }

        let errors = PageRequest { pagina: 0, tamano_pagina: 15 }.validate();
        assert_eq!(errors.len(), 2, "errors: {:?}", errors);
    }

    #[test]
    fn test_pagination_offsets() {
        let items: Vec<u32> = (1..=25).collect();

        let first = paginate(items.clone(), PageRequest { pagina: 1, tamano_pagina: 10 });
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_registros, 25);
        assert_eq!(first.total_paginas, 3);

        let last = paginate(items.clone(), PageRequest { pagina: 3, tamano_pagina: 10 });
        assert_eq!(last.items, vec![21, 22, 23, 24, 25]);

        let past_end = paginate(items, PageRequest { pagina: 4, tamano_pagina: 10 });
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.pagina, 4);
        assert_eq!(past_end.total_paginas, 3);
    }

    #[test]
    fn test_pagination_of_empty_list() {
        let page = paginate(Vec::<u32>::new(), PageRequest::default());

        assert!(page.items.is_empty());
        assert_eq!(page.total_registros, 0);
        assert_eq!(page.total_paginas, 0);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["tamanoPagina"], DEFAULT_PAGE_SIZE);
        assert_eq!(json["totalRegistros"], 0);
    }

    #[test]
    fn test_csv_export_has_one_column_per_concept() {
        let rows = vec![
            report_row("1", vec![concept("Bono Metas", dec!(50))]),
            report_row("2", vec![concept("Asignacion Familiar", dec!(102.5))]),
        ];

        let bytes = payroll_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("DNI,NombreCompleto,NombreCampaña,Cargo,FechaIngreso"));
        assert!(lines[0].ends_with("DescuentoFaltas,Asignacion Familiar,Bono Metas,TotalPagar"));
        assert!(lines[1].ends_with("0.00,50.00,1284.50"), "row: {}", lines[1]);
        assert!(lines[2].ends_with("102.50,0.00,1337.00"), "row: {}", lines[2]);
        assert!(lines[1].contains("03/07/2023"));
    }

    #[test]
    fn test_csv_export_of_empty_report_has_header_only() {
        let bytes = payroll_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.trim_end().ends_with("DescuentoFaltas,TotalPagar"));
    }
}
