// src/sites/easylaw/extract.rs

//! Q&A extraction from EasyLaw list pages.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Value, json};

use crate::error::Result;
use crate::utils::{clean_text, pattern, resolve, selector};
use crate::utils::time::now_kst;

/// Category id (`onhunqnaAstSeq`) to display name.
const CATEGORIES: &[(&str, &str)] = &[
    ("25", "가정법률"),
    ("89", "아동-청소년_교육"),
    ("84", "부동산_임대차"),
    ("92", "금융_보험"),
    ("83", "사업"),
    ("91", "창업"),
    ("100", "무역_출입국"),
    ("88", "소비자"),
    ("87", "문화_여가생활"),
    ("85", "민형사_소송"),
    ("90", "교통_운전"),
    ("82", "근로_노동"),
    ("97", "복지"),
    ("81", "국방_보훈"),
    ("94", "정보통신_기술"),
    ("96", "환경_에너지"),
    ("86", "사회안전_범죄"),
    ("95", "국가_및_지자체"),
];

const FALLBACK_CATEGORY: &str = "기타";

const SIMPLE_FIELDS: &[&str] = &["category_id", "category_name", "question", "answer"];

/// Compiled selectors and patterns for the list page.
pub struct Extractor {
    item: Selector,
    question: Selector,
    answer_block: Selector,
    answer: Selector,
    question_seq: Regex,
    category_seq: Regex,
    base_url: String,
}

/// Display name for a category id, `기타` when unknown.
pub fn category_name(category_id: Option<&str>) -> &'static str {
    category_id
        .and_then(|id| CATEGORIES.iter().find(|(key, _)| *key == id))
        .map(|(_, name)| *name)
        .unwrap_or(FALLBACK_CATEGORY)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Absolute URL for a link on the Q&A pages.
pub fn full_url(base_url: &str, href: &str) -> String {
    let base = format!("{}/CSP/", base_url.trim_end_matches('/'));
    resolve(&base, href).unwrap_or_else(|| href.to_string())
}

fn text_of(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

impl Extractor {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            item: selector("ul.question li.qa")?,
            question: selector("div.ttl a")?,
            answer_block: selector("div.ans")?,
            answer: selector("p.line4-text")?,
            question_seq: pattern(r"onhunqueSeq=(\d+)")?,
            category_seq: pattern(r"onhunqnaAstSeq=(\d+)")?,
            base_url: base_url.to_string(),
        })
    }

    /// All valid Q&A items on a list page, in page order.
    pub fn extract_items(&self, html: &str) -> Vec<Value> {
        let document = Html::parse_document(html);
        let crawl_date = now_kst().to_rfc3339();
        document
            .select(&self.item)
            .filter_map(|item| self.extract_item(item, &crawl_date))
            .collect()
    }

    /// Extract one `li.qa` item; `None` when required parts are missing or empty.
    fn extract_item(&self, item: ElementRef<'_>, crawl_date: &str) -> Option<Value> {
        let link = item.select(&self.question).next()?;
        let answer_block = item.select(&self.answer_block).next()?;

        let href = link.value().attr("href").unwrap_or_default();
        let question = text_of(link);
        let answer = answer_block
            .select(&self.answer)
            .next()
            .map(text_of)
            .unwrap_or_default();

        if href.is_empty() || question.is_empty() || answer.is_empty() {
            return None;
        }

        let question_id = capture(&self.question_seq, href);
        let category_id = capture(&self.category_seq, href);
        let category = category_name(category_id.as_deref());
        let full_url = full_url(&self.base_url, href);

        let text_content = [
            format!("질문: {question}"),
            format!("답변: {answer}"),
            format!("카테고리: {category}"),
        ]
        .join("\n\n");

        Some(json!({
            "question_id": question_id,
            "category_id": category_id,
            "category_name": category,
            "question": question,
            "answer": answer,
            "detail_url": href,
            "full_url": full_url,
            "text_content": text_content,
            "title": question,
            "metadata": {
                "question_id": question_id,
                "category_id": category_id,
                "category_name": category,
                "detail_url": href,
                "full_url": full_url,
                "document_type": "qa",
                "crawl_date": crawl_date,
            },
        }))
    }
}

/// Reduce a record to the simple field set.
pub fn simplify(record: &Value) -> Value {
    let map = SIMPLE_FIELDS
        .iter()
        .map(|key| {
            (
                key.to_string(),
                record.get(*key).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    Value::Object(map)
}
