//! Printable attendance reports (PDF and Word).

use std::error::Error;

use chrono::{DateTime, Local, NaiveDate};
use handlebars::Handlebars;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex, Rect, Rgb,
};
use serde::Serialize;

use crate::record::{AttendanceRecord, DATE_FORMAT, Status, Summary};

pub const REPORT_TITLE: &str = "Employee Attendance Report";

const DOC_TEMPLATE: &str = include_str!("../templates/report_doc.hbs");

// A4 portrait, in millimetres from the top-left corner.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const HEADER_BAND_Y: f32 = 75.0;
const HEADER_BAND_HEIGHT: f32 = 7.0;
const HEADER_Y: f32 = 80.0;
const FIRST_ROW_Y: f32 = 85.0;
const CONTINUED_ROW_Y: f32 = 20.0;
const LAST_ROW_Y: f32 = 270.0;
const ROW_STEP: f32 = 7.0;

/// Everything a report needs besides its format.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub generated: DateTime<Local>,
    pub records: Vec<AttendanceRecord>,
}

impl ReportContext {
    pub fn new(start: NaiveDate, end: NaiveDate, records: Vec<AttendanceRecord>) -> Self {
        ReportContext {
            start,
            end,
            generated: Local::now(),
            records,
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// `2024-01-01 to 2024-01-31`
    pub fn date_range(&self) -> String {
        format!("{} to {}", self.start_str(), self.end_str())
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.records)
    }

    pub fn generated_date(&self) -> String {
        self.generated.format(DATE_FORMAT).to_string()
    }
}

#[derive(Serialize)]
struct DocRow<'a> {
    #[serde(rename = "employeeName")]
    employee_name: &'a str,
    #[serde(rename = "employeeID")]
    employee_id: &'a str,
    date: &'a str,
    status: &'static str,
    status_class: String,
}

#[derive(Serialize)]
struct DocData<'a> {
    title: &'static str,
    date_range: String,
    summary: Summary,
    rate: String,
    rows: Vec<DocRow<'a>>,
    generated: String,
}

/// Renders the report as an HTML document Word opens natively.
pub fn to_doc(ctx: &ReportContext) -> Result<String, Box<dyn Error>> {
    let summary = ctx.summary();
    let data = DocData {
        title: REPORT_TITLE,
        date_range: ctx.date_range(),
        rate: summary.rate_label(),
        summary,
        rows: ctx
            .records
            .iter()
            .map(|r| DocRow {
                employee_name: &r.employee_name,
                employee_id: &r.employee_id,
                date: &r.date,
                status: r.status.as_str(),
                status_class: r.status.as_str().to_lowercase(),
            })
            .collect(),
        generated: ctx.generated_date(),
    };

    Ok(Handlebars::new().render_template(DOC_TEMPLATE, &data)?)
}

/// Splits rows into pages the way the PDF lays them out.
fn paginate(rows: usize) -> Vec<std::ops::Range<usize>> {
    let first = ((LAST_ROW_Y - FIRST_ROW_Y) / ROW_STEP) as usize + 1;
    let rest = ((LAST_ROW_Y - CONTINUED_ROW_Y) / ROW_STEP) as usize + 1;

    let mut pages = vec![0..rows.min(first)];
    let mut start = first;
    while start < rows {
        let end = (start + rest).min(rows);
        pages.push(start..end);
        start = end;
    }
    pages
}

/// Rough Helvetica width, good enough to centre short lines.
fn centered_x(text: &str, font_size: f32) -> f32 {
    let pt_to_mm = 0.3528;
    let width = text.chars().count() as f32 * font_size * 0.5 * pt_to_mm;
    ((PAGE_WIDTH - width) / 2.0).max(0.0)
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Font size, weight and fill colour for a run of text.
#[derive(Clone)]
struct TextStyle {
    size: f32,
    bold: bool,
    color: Color,
}

impl TextStyle {
    fn regular(size: f32, color: Color) -> Self {
        TextStyle {
            size,
            bold: false,
            color,
        }
    }

    fn bold(size: f32, color: Color) -> Self {
        TextStyle {
            size,
            bold: true,
            color,
        }
    }
}

struct PdfWriter {
    doc: PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl PdfWriter {
    fn new() -> Result<Self, Box<dyn Error>> {
        let (doc, page, layer) =
            PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        Ok(PdfWriter {
            doc,
            pages: vec![(page, layer)],
            regular,
            bold,
        })
    }

    fn add_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.pages.push((page, layer));
    }

    fn layer(&self, page: usize) -> PdfLayerReference {
        let (page_idx, layer_idx) = self.pages[page];
        self.doc.get_page(page_idx).get_layer(layer_idx)
    }

    /// Writes `text` at `(x, y)` measured from the top-left of page `page`.
    fn text(&self, page: usize, text: &str, x: f32, y: f32, style: &TextStyle) {
        let layer = self.layer(page);
        let font = if style.bold { &self.bold } else { &self.regular };

        layer.set_fill_color(style.color.clone());
        layer.use_text(text, style.size, Mm(x), Mm(PAGE_HEIGHT - y), font);
    }

    fn centered(&self, page: usize, text: &str, y: f32, style: &TextStyle) {
        self.text(page, text, centered_x(text, style.size), y, style);
    }

    /// Fills a rectangle whose top-left corner is `(x, y)`.
    fn band(&self, page: usize, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let layer = self.layer(page);
        layer.set_fill_color(color);
        layer.add_rect(Rect::new(
            Mm(x),
            Mm(PAGE_HEIGHT - y - height),
            Mm(x + width),
            Mm(PAGE_HEIGHT - y),
        ));
    }

    fn finish(self) -> Result<Vec<u8>, Box<dyn Error>> {
        Ok(self.doc.save_to_bytes()?)
    }
}

/// Renders the report as a paginated A4 PDF.
pub fn to_pdf(ctx: &ReportContext) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut pdf = PdfWriter::new()?;
    let summary = ctx.summary();

    pdf.centered(0, REPORT_TITLE, 20.0, &TextStyle::regular(20.0, rgb(40, 40, 40)));

    let muted = TextStyle::regular(12.0, rgb(100, 100, 100));
    pdf.centered(0, &format!("Date Range: {}", ctx.date_range()), 30.0, &muted);

    let lines = [
        format!("Total Records: {}", summary.total),
        format!("Present: {}", summary.present),
        format!("Absent: {}", summary.absent),
        format!("Attendance Rate: {}", summary.rate_label()),
    ];
    let summary_style = TextStyle { size: 11.0, ..muted };
    for (i, line) in lines.iter().enumerate() {
        pdf.text(0, line, 20.0, 45.0 + 7.0 * i as f32, &summary_style);
    }

    let band_width = PAGE_WIDTH - 40.0;
    pdf.band(0, 20.0, HEADER_BAND_Y, band_width, HEADER_BAND_HEIGHT, rgb(41, 128, 185));
    let header = TextStyle::bold(10.0, rgb(255, 255, 255));
    for (label, x) in [
        ("Employee Name", 25.0),
        ("Employee ID", 70.0),
        ("Date", 110.0),
        ("Status", 150.0),
    ] {
        pdf.text(0, label, x, HEADER_Y, &header);
    }

    let cell = TextStyle::regular(10.0, rgb(0, 0, 0));
    let pages = paginate(ctx.records.len());
    for (page, rows) in pages.iter().enumerate() {
        if page > 0 {
            pdf.add_page();
        }
        let mut y = if page == 0 { FIRST_ROW_Y } else { CONTINUED_ROW_Y };
        for record in &ctx.records[rows.clone()] {
            let status = TextStyle {
                color: match record.status {
                    Status::Present => rgb(39, 174, 96),
                    Status::Absent => rgb(231, 76, 60),
                },
                ..cell.clone()
            };
            pdf.text(page, or_na(&record.employee_name), 25.0, y, &cell);
            pdf.text(page, or_na(&record.employee_id), 70.0, y, &cell);
            pdf.text(page, or_na(&record.date), 110.0, y, &cell);
            pdf.text(page, record.status.as_str(), 150.0, y, &status);
            y += ROW_STEP;
        }
    }

    let total = pdf.pages.len();
    let footer = TextStyle::regular(8.0, rgb(150, 150, 150));
    let generated = format!("Generated on {}", ctx.generated_date());
    for page in 0..total {
        pdf.centered(page, &format!("Page {} of {}", page + 1, total), 290.0, &footer);
        pdf.centered(page, &generated, 295.0, &footer);
    }

    pdf.finish()
}

pub(crate) fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}
