//! Render report tables into [`Sheet`]s.

use std::ops::Add;

use super::{Cell, Section, Sheet};
use crate::analysis::{CohortTable, KpiTables, PivotTable, PivotTables, RfmProfile};
use crate::models::month_label;
use crate::pipeline::Report;

/// All six sheets, in workbook order.
pub fn report_sheets(report: &Report) -> Vec<Sheet> {
    vec![
        Sheet::new("overall", vec![overall_section(&report.kpis)]),
        Sheet::new("monthly", vec![monthly_section(&report.kpis)]),
        Sheet::new(
            "city_perf",
            vec![city_section(&report.kpis), region_section(&report.kpis)],
        ),
        Sheet::new("pivots", pivot_sections(&report.pivots)),
        Sheet::new("RFM", vec![rfm_section(&report.rfm)]),
        Sheet::new("cohort", vec![cohort_section(&report.cohorts)]),
    ]
}

fn overall_section(kpis: &KpiTables) -> Section {
    let o = &kpis.overall;
    let mut section = Section::new(
        "overall.csv",
        &[
            "total_txns",
            "total_amount",
            "median_amount",
            "mean_amount",
            "pct_night",
            "pct_high_value",
        ],
    );
    section.push_row(vec![
        o.total_txns.into(),
        o.total_amount.into(),
        o.median_amount.into(),
        o.mean_amount.into(),
        o.pct_night.into(),
        o.pct_high_value.into(),
    ]);
    section
}

fn monthly_section(kpis: &KpiTables) -> Section {
    let mut section = Section::new(
        "monthly.csv",
        &["month", "txn_count", "gmv", "night_count", "high_value_count"],
    );
    for m in &kpis.monthly {
        section.push_row(vec![
            month_label(m.month).into(),
            m.txn_count.into(),
            m.gmv.into(),
            m.night_count.into(),
            m.high_value_count.into(),
        ]);
    }
    section
}

fn city_section(kpis: &KpiTables) -> Section {
    let mut section = Section::new(
        "city_perf.csv",
        &[
            "city",
            "region",
            "txn_count",
            "total_amount",
            "mean_amount",
            "night_count",
            "high_value_count",
        ],
    );
    for c in &kpis.city_perf {
        section.push_row(vec![
            c.city.as_str().into(),
            c.region.as_str().into(),
            c.txn_count.into(),
            c.total_amount.into(),
            c.mean_amount.into(),
            c.night_count.into(),
            c.high_value_count.into(),
        ]);
    }
    section
}

fn region_section(kpis: &KpiTables) -> Section {
    let mut section = Section::new(
        "region_perf.csv",
        &[
            "region",
            "txn_count",
            "total_amount",
            "mean_amount",
            "night_count",
            "high_value_count",
        ],
    )
    .with_title("Region rollup");
    for r in &kpis.region_perf {
        section.push_row(vec![
            r.region.as_str().into(),
            r.txn_count.into(),
            r.total_amount.into(),
            r.mean_amount.into(),
            r.night_count.into(),
            r.high_value_count.into(),
        ]);
    }
    section
}

fn pivot_sections(pivots: &PivotTables) -> Vec<Section> {
    vec![
        pivot_section(
            &pivots.month_city,
            "pivot_month_city.csv",
            "Amount by month and city",
        ),
        pivot_section(
            &pivots.type_month_amount,
            "pivot_type_month_amount.csv",
            "Amount by type and month",
        ),
        pivot_section(
            &pivots.type_month_count,
            "pivot_type_month_count.csv",
            "Count by type and month",
        ),
    ]
}

/// Pivot with a trailing `total` column and a trailing `total` row.
fn pivot_section<V>(pivot: &PivotTable<V>, file_name: &str, title: &str) -> Section
where
    V: Copy + Default + Add<Output = V> + Into<Cell>,
{
    let mut headers: Vec<&str> = vec![pivot.row_label.as_str()];
    headers.extend(pivot.columns.iter().map(String::as_str));
    headers.push("total");

    let mut section = Section::new(file_name, &headers).with_title(title);

    for ((label, cells), total) in pivot.rows.iter().zip(&pivot.cells).zip(pivot.row_totals()) {
        let mut row: Vec<Cell> = Vec::with_capacity(cells.len() + 2);
        row.push(label.as_str().into());
        row.extend(cells.iter().map(|&v| Into::<Cell>::into(v)));
        row.push(total.into());
        section.push_row(row);
    }

    let mut totals: Vec<Cell> = vec!["total".into()];
    totals.extend(pivot.column_totals().into_iter().map(Into::<Cell>::into));
    totals.push(pivot.grand_total().into());
    section.push_row(totals);

    section
}

fn rfm_section(profiles: &[RfmProfile]) -> Section {
    let mut section = Section::new(
        "rfm.csv",
        &[
            "account_id",
            "last_txn_date",
            "recency_days",
            "frequency",
            "monetary",
            "r_rank",
            "f_rank",
            "m_rank",
            "rfm_score",
            "rfm_total",
        ],
    );
    for p in profiles {
        section.push_row(vec![
            p.account_id.as_str().into(),
            p.last_txn_date.format("%Y-%m-%d").to_string().into(),
            p.recency_days.into(),
            p.frequency.into(),
            p.monetary.into(),
            p.r_rank.into(),
            p.f_rank.into(),
            p.m_rank.into(),
            p.rfm_score.as_str().into(),
            p.rfm_total.into(),
        ]);
    }
    section
}

/// Retention matrix. Offsets where a cohort had nobody active stay blank.
fn cohort_section(cohorts: &CohortTable) -> Section {
    let offset_headers: Vec<String> = cohorts.offsets.iter().map(|k| format!("month_{k}")).collect();
    let mut headers = vec!["cohort_month", "size"];
    headers.extend(offset_headers.iter().map(String::as_str));

    let mut section = Section::new("cohort_retention.csv", &headers);
    for row in &cohorts.rows {
        let mut cells: Vec<Cell> = vec![month_label(row.cohort_month).into(), row.size.into()];
        cells.extend(
            cohorts
                .offsets
                .iter()
                .map(|k| row.retention.get(k).map_or(Cell::Empty, |&r| Cell::Ratio(r))),
        );
        section.push_row(cells);
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportOptions;
    use crate::export::SHEET_ORDER;
    use crate::pipeline::run_bytes;

    const LEDGER: &str = "\
account_id,txn_time,amount,txn_type,description,city
a,2023-01-03 10:00:00,10,UPI,x,Pune
b,2023-01-12 10:00:00,20,CARD,x,Delhi
c,2023-01-25 10:00:00,30,UPI,x,Pune
a,2023-02-02 10:00:00,40,UPI,x,Delhi
a,2023-03-15 10:00:00,50,CARD,x,Pune
";

    fn sheets() -> Vec<Sheet> {
        let report = run_bytes(LEDGER.as_bytes(), &ReportOptions::default()).unwrap();
        report_sheets(&report)
    }

    fn section<'a>(sheets: &'a [Sheet], file: &str) -> &'a Section {
        sheets
            .iter()
            .flat_map(|s| &s.sections)
            .find(|s| s.file_name == file)
            .unwrap()
    }

    #[test]
    fn test_sheet_order() {
        let names: Vec<String> = sheets().into_iter().map(|s| s.name).collect();
        assert_eq!(names, SHEET_ORDER);
    }

    #[test]
    fn test_every_flat_file_present_once() {
        let sheets = sheets();
        let mut files: Vec<&str> = sheets
            .iter()
            .flat_map(|s| &s.sections)
            .map(|s| s.file_name.as_str())
            .collect();
        files.sort();
        assert_eq!(
            files,
            vec![
                "city_perf.csv",
                "cohort_retention.csv",
                "monthly.csv",
                "overall.csv",
                "pivot_month_city.csv",
                "pivot_type_month_amount.csv",
                "pivot_type_month_count.csv",
                "region_perf.csv",
                "rfm.csv",
            ]
        );
    }

    #[test]
    fn test_rows_match_header_width() {
        for sheet in sheets() {
            for section in &sheet.sections {
                for row in &section.rows {
                    assert_eq!(row.len(), section.headers.len(), "{}", section.file_name);
                }
            }
        }
    }

    #[test]
    fn test_months_rendered_as_labels() {
        let sheets = sheets();
        let monthly = section(&sheets, "monthly.csv");
        let months: Vec<String> = monthly.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(months, vec!["2023-01", "2023-02", "2023-03"]);
    }

    #[test]
    fn test_pivot_totals() {
        let sheets = sheets();
        let pivot = section(&sheets, "pivot_type_month_count.csv");
        assert_eq!(
            pivot.headers,
            vec!["txn_type", "2023-01", "2023-02", "2023-03", "total"]
        );
        let last = pivot.rows.last().unwrap();
        assert_eq!(last[0], Cell::from("total"));
        assert_eq!(last[4], Cell::Integer(5));
        // CARD row
        assert_eq!(pivot.rows[0][0], Cell::from("CARD"));
        assert_eq!(pivot.rows[0][4], Cell::Integer(2));
    }

    #[test]
    fn test_cohort_blank_cells() {
        let sheets = sheets();
        let cohort = section(&sheets, "cohort_retention.csv");
        assert_eq!(
            cohort.headers,
            vec!["cohort_month", "size", "month_0", "month_1", "month_2"]
        );
        let jan = &cohort.rows[0];
        assert_eq!(jan[1], Cell::Integer(3));
        assert_eq!(jan[2], Cell::Ratio(1.0));
        assert_eq!(jan[3], Cell::Ratio(1.0 / 3.0));
        assert_eq!(jan[4].to_string(), "0.333");
    }

    #[test]
    fn test_rfm_dates_formatted() {
        let sheets = sheets();
        let rfm = section(&sheets, "rfm.csv");
        assert_eq!(rfm.rows[0][0], Cell::from("a"));
        assert_eq!(rfm.rows[0][1], Cell::from("2023-03-15"));
        assert_eq!(rfm.rows[0][2], Cell::Integer(1));
    }
}
