// src/sites/law_open_api/parse.rs

//! Precedent list and detail page parsing, plus retrieval-oriented shaping.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::utils::{clean_text, pattern, selector};

/// Minimum text length for a detail page to count as a judgment.
const MIN_JUDGMENT_CHARS: usize = 500;

/// Minimum body length for a detail response worth parsing.
const MIN_DETAIL_BODY: usize = 1000;

const DETAIL_MARKERS: &[&str] = &["판시사항", "판결요지", "주문", "이유", "사건명", "법원명"];

/// Fields folded into `text_content` and dropped from the record.
const BULKY_FIELDS: &[&str] = &[
    "case_content",
    "full_judgment_text",
    "judgment_order",
    "reasoning",
    "judgment_sections",
    "reply_content",
    "reference_law",
    "reference_case",
];

const SIMPLE_FIELDS: &[&str] = &["prec_id", "title", "summary", "text_content", "metadata"];

/// Whitespace-collapsed text without trailing dots (`2024.03.07.` → `2024.03.07`).
pub fn clean(text: &str) -> String {
    clean_text(text).trim_end_matches('.').to_string()
}

/// One judgment section: text after `start` up to the first `end` marker.
struct Section {
    field: &'static str,
    start: Regex,
    end: Option<Regex>,
}

/// Compiled selectors and patterns for list and detail pages.
pub struct Parser {
    row: Selector,
    cell: Selector,
    link: Selector,
    h2: Selector,
    title: Selector,
    prec_id: Regex,
    case_numbers: Vec<Regex>,
    courts: Vec<Regex>,
    dates: Vec<Regex>,
    date_shape: Regex,
    sections: Vec<Section>,
}

impl Parser {
    pub fn new() -> Result<Self> {
        let section = |field, start: &str, end: Option<&str>| -> Result<Section> {
            Ok(Section {
                field,
                start: pattern(start)?,
                end: end.map(pattern).transpose()?,
            })
        };

        Ok(Self {
            row: selector("table.tbl8 tbody tr")?,
            cell: selector("td")?,
            link: selector("a")?,
            h2: selector("h2")?,
            title: selector("title")?,
            prec_id: pattern(r"ID=(\d+)")?,
            case_numbers: vec![
                pattern(r"(\d{4}[가-힣]+\d+(?:,\s*\d+)*)")?,
                pattern(r"([가-힣]+법원[^-]*-\d{4}-[가-힣]+-\d+)")?,
                pattern(r"사건번호[:\s]*([^\n\r]+)")?,
            ],
            courts: vec![
                pattern(r"([가-힣]+법원)")?,
                pattern(r"법원명[:\s]*([^\n\r]+)")?,
            ],
            dates: vec![
                pattern(r"(\d{4}\.\s*\d{1,2}\.\s*\d{1,2})")?,
                pattern(r"선고일[:\s]*([^\n\r]+)")?,
            ],
            date_shape: pattern(r"^\d{4}\.\s*\d{1,2}\.\s*\d{1,2}")?,
            sections: vec![
                section("judgment_order", r"주\s*문\s*", Some(r"청구취지|이\s*유"))?,
                section("claim_purpose", r"청구취지\s*", Some(r"이\s*유|항소취지"))?,
                section("reasoning", r"이\s*유\s*", None)?,
                section("judgment_summary", r"판결요지\s*", Some(r"판시사항|참조조문"))?,
                section("judgment_point", r"판시사항\s*", Some(r"판결요지|참조조문"))?,
                section("reference_law", r"참조조문\s*", Some(r"참조판례"))?,
                section("reference_case", r"참조판례\s*", None)?,
            ],
        })
    }

    /// Rows of a search result page. A page without the result table is empty.
    pub fn parse_list(&self, html: &str, keyword: &str, crawl_date: &str) -> Vec<Value> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for row in document.select(&self.row) {
            let cells: Vec<_> = row.select(&self.cell).collect();
            if cells.len() < 6 {
                continue;
            }
            let Some(link) = cells[1].select(&self.link).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();
            let Some(prec_id) = first_capture(&self.prec_id, href) else {
                continue;
            };
            let text = |i: usize| clean(&cells[i].text().collect::<String>());

            records.push(json!({
                "prec_id": prec_id,
                "case_name": text(1),
                "court_name": text(2),
                "case_type_name": text(3),
                "judgment_type": text(4),
                "judgment_date": text(5),
                "detail_link": href,
                "keywords": keyword,
                "crawl_date": crawl_date,
            }));
        }

        records
    }

    /// Whether a detail response looks like it holds a judgment.
    pub fn is_judgment_page(body: &str) -> bool {
        body.len() > MIN_DETAIL_BODY && DETAIL_MARKERS.iter().any(|m| body.contains(m))
    }

    /// Fields from a `precInfoP.do` page; empty when nothing useful was found.
    pub fn parse_detail(&self, html: &str) -> Map<String, Value> {
        let document = Html::parse_document(html);
        let mut data = Map::new();

        let heading = document
            .select(&self.h2)
            .map(|h2| h2.text().collect::<String>().trim().to_string())
            .find(|t| !t.is_empty() && (t.contains('·') || t.chars().count() > 10));
        let case_name = heading.or_else(|| {
            document.select(&self.title).next().and_then(|title| {
                let text = title.text().collect::<String>();
                text.split_once('|').map(|(name, _)| name.trim().to_string())
            })
        });
        if let Some(name) = case_name {
            data.insert("case_name".into(), json!(name));
        }

        let full_text = document.root_element().text().collect::<Vec<_>>().join(" ");

        if let Some(number) = self
            .case_numbers
            .iter()
            .find_map(|re| first_capture(re, &full_text))
        {
            data.insert("case_number".into(), json!(number.trim()));
        }

        if let Some(court) = self
            .courts
            .iter()
            .filter_map(|re| first_capture(re, &full_text))
            .map(|c| c.trim().to_string())
            .find(|c| c.contains("법원"))
        {
            data.insert("court_name".into(), json!(court));
        }

        if let Some(date) = self
            .dates
            .iter()
            .filter_map(|re| first_capture(re, &full_text))
            .map(|d| d.trim().to_string())
            .find(|d| self.date_shape.is_match(d))
        {
            data.insert("judgment_date".into(), json!(date.replace(' ', "")));
        }

        let cleaned = clean(&full_text);
        if cleaned.chars().count() > MIN_JUDGMENT_CHARS {
            data.insert("case_content".into(), json!(cleaned));
            data.insert("full_judgment_text".into(), json!(cleaned));
            data.extend(self.judgment_sections(&cleaned));
        }

        data.retain(|_, v| v.as_str().is_none_or(|s| !s.is_empty()));
        data
    }

    /// Named sections (주문, 청구취지, 이유, 판결요지, 판시사항, 참조조문, 참조판례).
    pub fn judgment_sections(&self, text: &str) -> Map<String, Value> {
        let mut sections = Map::new();
        for section in &self.sections {
            let Some(start) = section.start.find(text) else {
                continue;
            };
            let rest = &text[start.end()..];
            let end = section
                .end
                .as_ref()
                .and_then(|re| re.find_iter(rest).map(|m| m.start()).find(|&i| i > 0))
                .unwrap_or(rest.len());
            let body = clean(&rest[..end]);
            if !body.is_empty() {
                sections.insert(section.field.to_string(), json!(body));
            }
        }
        sections
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Fold a precedent into retrieval-ready form.
///
/// Adds `text_content`, `title`, `summary` and `metadata`; drops the long
/// fields whose content now lives in `text_content`.
pub fn shape_for_retrieval(mut record: Map<String, Value>) -> Map<String, Value> {
    let mut parts = Vec::new();
    let case_name = str_field(&record, "case_name").to_string();
    if !case_name.is_empty() {
        parts.push(format!("사건명: {case_name}"));
    }

    let basic: Vec<String> = [
        ("사건번호", "case_number"),
        ("법원명", "court_name"),
        ("선고일자", "judgment_date"),
        ("사건종류", "case_type_name"),
    ]
    .iter()
    .filter_map(|(label, key)| {
        let value = str_field(&record, key);
        (!value.is_empty()).then(|| format!("{label}: {value}"))
    })
    .collect();
    if !basic.is_empty() {
        parts.push(format!("기본정보: {}", basic.join(", ")));
    }

    let body = match str_field(&record, "full_judgment_text") {
        "" => str_field(&record, "case_content"),
        full => full,
    };
    if !body.is_empty() {
        parts.push(format!("판례내용: {body}"));
    }

    let metadata = json!({
        "case_number": str_field(&record, "case_number"),
        "court_name": str_field(&record, "court_name"),
        "judgment_date": str_field(&record, "judgment_date"),
        "case_type_name": str_field(&record, "case_type_name"),
        "keywords": str_field(&record, "keywords"),
        "crawl_date": str_field(&record, "crawl_date"),
        "document_type": "precedent",
        "prec_id": str_field(&record, "prec_id"),
        "document_class": str_field(&record, "document_class"),
        "year": str_field(&record, "year"),
    });
    let summary = str_field(&record, "judgment_summary").to_string();
    let text_content = parts.join("\n\n");

    for field in BULKY_FIELDS {
        record.remove(*field);
    }
    record.insert("text_content".into(), json!(text_content));
    record.insert("title".into(), json!(case_name));
    record.insert("summary".into(), json!(summary));
    record.insert("metadata".into(), metadata);
    record
}

/// Simple records keep the retrieval fields only.
pub fn simplify(record: Map<String, Value>) -> Map<String, Value> {
    record
        .into_iter()
        .filter(|(key, _)| SIMPLE_FIELDS.contains(&key.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"
        <table class="tbl8"><tbody>
          <tr>
            <td>1</td>
            <td><a href="/DRF/lawService.do?OC=x&amp;target=prec&amp;ID=228541&amp;type=HTML">임금   청구의 소</a></td>
            <td>대법원</td><td>민사</td><td>판결</td><td>2024.03.07.</td>
          </tr>
          <tr><td>short row</td></tr>
          <tr>
            <td>2</td><td><a href="/no-id">링크</a></td>
            <td>a</td><td>b</td><td>c</td><td>d</td>
          </tr>
        </tbody></table>
    "#;

    #[test]
    fn test_parse_list() {
        let parser = Parser::new().unwrap();
        let rows = parser.parse_list(LIST, "근로", "2025-01-01T00:00:00+09:00");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["prec_id"], "228541");
        assert_eq!(rows[0]["case_name"], "임금 청구의 소");
        assert_eq!(rows[0]["court_name"], "대법원");
        assert_eq!(rows[0]["judgment_date"], "2024.03.07");
        assert_eq!(rows[0]["keywords"], "근로");
    }

    #[test]
    fn test_list_without_table_is_empty() {
        let parser = Parser::new().unwrap();
        assert!(parser.parse_list("<p>검색 결과가 없습니다</p>", "근로", "").is_empty());
    }

    #[test]
    fn test_judgment_sections() {
        let parser = Parser::new().unwrap();
        let text = "판시사항 근로자성 판단 기준. 판결요지 실질에 따라 판단한다. 참조조문 근로기준법 제2조 \
                    참조판례 대법원 2006다1234 주 문 상고를 기각한다. 이 유 상고이유를 판단한다.";
        let sections = parser.judgment_sections(text);
        assert_eq!(sections["judgment_point"], "근로자성 판단 기준");
        assert_eq!(sections["judgment_summary"], "실질에 따라 판단한다");
        assert_eq!(sections["reference_law"], "근로기준법 제2조");
        assert_eq!(sections["judgment_order"], "상고를 기각한다");
        assert_eq!(sections["reasoning"], "상고이유를 판단한다");
        assert!(sections.get("claim_purpose").is_none());
    }

    #[test]
    fn test_parse_detail() {
        let parser = Parser::new().unwrap();
        let filler = "근로관계의 실질을 살펴 판단하여야 한다. ".repeat(40);
        let html = format!(
            "<html><head><title>임금 | 국가법령정보센터</title></head><body>\
             <h2>임금·퇴직금 청구의 소</h2>\
             <p>대법원 2024. 3. 7. 선고 2021다245528 판결</p>\
             <p>판시사항 근로자성 판단 기준</p><p>판결요지 {filler}</p>\
             <p>주 문 상고를 기각한다.</p><p>이 유 상고이유를 판단한다.</p></body></html>"
        );
        let data = parser.parse_detail(&html);
        assert_eq!(data["case_name"], "임금·퇴직금 청구의 소");
        assert_eq!(data["case_number"], "2021다245528");
        assert_eq!(data["court_name"], "대법원");
        assert_eq!(data["judgment_date"], "2024.3.7");
        assert!(data.contains_key("full_judgment_text"));
        assert_eq!(data["judgment_point"], "근로자성 판단 기준");
    }

    #[test]
    fn test_shape_for_retrieval() {
        let record = json!({
            "prec_id": "1",
            "case_name": "임금",
            "court_name": "대법원",
            "judgment_date": "2024.03.07",
            "full_judgment_text": "전문",
            "reasoning": "이유",
            "judgment_summary": "요지",
            "keywords": "근로"
        });
        let Value::Object(map) = record else { unreachable!() };
        let shaped = shape_for_retrieval(map);

        assert_eq!(
            shaped["text_content"],
            "사건명: 임금\n\n기본정보: 법원명: 대법원, 선고일자: 2024.03.07\n\n판례내용: 전문"
        );
        assert_eq!(shaped["title"], "임금");
        assert_eq!(shaped["summary"], "요지");
        assert_eq!(shaped["metadata"]["document_type"], "precedent");
        assert_eq!(shaped["metadata"]["case_number"], "");
        assert!(!shaped.contains_key("reasoning"));
        assert!(!shaped.contains_key("full_judgment_text"));

        let simple = simplify(shaped);
        assert_eq!(simple.len(), 5);
        assert!(!simple.contains_key("court_name"));
    }
}
