use std::error::Error;
use std::str::FromStr;

use serde::Serialize;

use crate::record::AttendanceRecord;
use crate::report::{self, REPORT_TITLE, ReportContext, or_na};

/// File formats the exporter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Word,
    Csv,
    Json,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pdf" => Ok(ExportFormat::Pdf),
            "word" | "doc" => Ok(ExportFormat::Word),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("Unsupported export format '{}'", other)),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "doc",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Word => "application/msword;charset=utf-8",
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// Download name for a report covering `start..=end`
    ///
    /// Printable documents are called `attendance_report_*`, data dumps
    /// `attendance_*`.
    ///
    /// # Examples
    /// ```
    /// use attendance::downloader::ExportFormat;
    ///
    /// assert_eq!(
    ///     ExportFormat::Pdf.filename("2024-01-01", "2024-01-31"),
    ///     "attendance_report_2024-01-01_to_2024-01-31.pdf"
    /// );
    /// assert_eq!(
    ///     ExportFormat::Csv.filename("2024-01-01", "2024-01-31"),
    ///     "attendance_2024-01-01_to_2024-01-31.csv"
    /// );
    /// ```
    pub fn filename(&self, start: &str, end: &str) -> String {
        let prefix = match self {
            ExportFormat::Pdf | ExportFormat::Word => "attendance_report",
            _ => "attendance",
        };
        format!("{}_{}_to_{}.{}", prefix, start, end, self.extension())
    }
}

/// Render a report in the requested format
///
/// # Arguments
/// * `format` - Target file format
/// * `ctx` - Date range and records to include
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - File content as bytes or an error
pub fn render(format: ExportFormat, ctx: &ReportContext) -> Result<Vec<u8>, Box<dyn Error>> {
    match format {
        ExportFormat::Pdf => report::to_pdf(ctx),
        ExportFormat::Word => Ok(report::to_doc(ctx)?.into_bytes()),
        ExportFormat::Csv => Ok(to_csv(&ctx.records).into_bytes()),
        ExportFormat::Json => Ok(to_json(ctx)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(&ctx.records),
    }
}

/// Convert attendance records to CSV format
///
/// The first line is the header `Employee Name,Employee ID,Date,Status`.
/// Every field is wrapped in double quotes and embedded quotes are doubled,
/// so commas and newlines inside names survive a round trip through Excel.
///
/// # Arguments
/// * `records` - Records to write, in order
///
/// # Returns
/// * `String` - CSV content
pub fn to_csv(records: &[AttendanceRecord]) -> String {
    let mut csv_content = String::from("Employee Name,Employee ID,Date,Status");

    for record in records {
        csv_content.push('\n');
        let fields = [
            or_na(&record.employee_name),
            or_na(&record.employee_id),
            or_na(&record.date),
            record.status.as_str(),
        ];
        for (i, value) in fields.iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            csv_content.push('"');
            csv_content.push_str(&value.replace('"', "\"\""));
            csv_content.push('"');
        }
    }

    csv_content
}

#[derive(Serialize)]
struct ReportInfo {
    title: &'static str,
    #[serde(rename = "dateRange")]
    date_range: String,
    generated: String,
    #[serde(rename = "totalRecords")]
    total_records: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(rename = "reportInfo")]
    report_info: ReportInfo,
    data: &'a [AttendanceRecord],
}

/// Convert a report to pretty-printed JSON
///
/// Produces `{"reportInfo": {...}, "data": [...]}` where `generated` is an
/// RFC 3339 timestamp.
pub fn to_json(ctx: &ReportContext) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        report_info: ReportInfo {
            title: REPORT_TITLE,
            date_range: ctx.date_range(),
            generated: ctx.generated.to_rfc3339(),
            total_records: ctx.records.len(),
        },
        data: &ctx.records,
    };
    serde_json::to_string_pretty(&report)
}

/// Convert attendance records to XLSX format
///
/// This function exports the records to an Excel workbook using the
/// rust_xlsxwriter library, with a bold header row.
///
/// # Arguments
/// * `records` - Records to write
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn to_xlsx(records: &[AttendanceRecord]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (col, title) in ["Employee Name", "Employee ID", "Date", "Status"]
        .iter()
        .enumerate()
    {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, record.employee_name.as_str())?;
        worksheet.write_string(row, 1, record.employee_id.as_str())?;
        worksheet.write_string(row, 2, record.date.as_str())?;
        worksheet.write_string(row, 3, record.status.as_str())?;
    }

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
