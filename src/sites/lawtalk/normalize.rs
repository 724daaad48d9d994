// src/sites/lawtalk/normalize.rs

//! Record shaping for Lawtalk questions and guide posts.

use serde_json::{Map, Value, json};

const QUESTION_FIELDS: &[&str] = &[
    "_id",
    "user",
    "categories",
    "titleOrigin",
    "bodyOrigin",
    "title",
    "body",
    "slugs",
    "meta",
    "createdAt",
    "updatedAt",
];

const QUESTION_DETAIL_FIELDS: &[&str] = &["focusAdCategories", "modelType", "aiResponse"];

const ANSWER_CONTENT_FIELDS: &[&str] = &["_id", "answer", "body", "createdAt", "updatedAt", "number"];

const GUIDE_POST_FIELDS: &[&str] = &[
    "_id",
    "title",
    "titleOrigin",
    "type",
    "isPublished",
    "createdAt",
    "updatedAt",
    "htmlContent",
    "textContent",
    "categories",
    "keywords",
];

/// Field value or its default when absent.
fn field(record: &Value, key: &str) -> Value {
    match record.get(key) {
        Some(value) => value.clone(),
        None => match key {
            "categories" | "keywords" => json!([]),
            "aiResponse" => json!({}),
            "htmlContent" | "textContent" => json!(""),
            _ => Value::Null,
        },
    }
}

fn pick(record: &Value, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .map(|key| (key.to_string(), field(record, key)))
        .collect()
}

/// `body[].content` entries of an answer, trimmed to their core fields.
fn answer_contents(answer: &Value) -> Vec<Value> {
    answer
        .get("body")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let content = item.get("content").unwrap_or(&Value::Null);
                    Value::Object(pick(content, ANSWER_CONTENT_FIELDS))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn answers(question: &Value) -> &[Value] {
    question
        .get("answers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Shape a consultation question for output.
///
/// Simple keeps the question core and reduces each answer's lawyer to its id.
/// Detail adds AI/advertising fields and keeps the full lawyer object.
pub fn question(raw: &Value, simple: bool) -> Value {
    let mut out = pick(raw, QUESTION_FIELDS);

    let shaped: Vec<Value> = if simple {
        answers(raw)
            .iter()
            .map(|answer| {
                let lawyer = answer.get("lawyer").unwrap_or(&Value::Null);
                json!({
                    "_id": field(answer, "_id"),
                    "lawyer": field(lawyer, "_id"),
                    "role": field(lawyer, "role"),
                    "body": answer_contents(answer),
                })
            })
            .collect()
    } else {
        out.extend(pick(raw, QUESTION_DETAIL_FIELDS));
        answers(raw)
            .iter()
            .map(|answer| {
                json!({
                    "_id": field(answer, "_id"),
                    "lawyer": answer.get("lawyer").cloned().unwrap_or_else(|| json!({})),
                    "slug": field(answer, "slug"),
                    "body": { "content": answer_contents(answer) },
                })
            })
            .collect()
    };

    out.insert("answers".to_string(), Value::Array(shaped));
    Value::Object(out)
}

/// Shape a guide post: simple keeps a fixed subset, detail keeps everything.
pub fn guide_post(raw: &Value, simple: bool) -> Value {
    if !simple {
        return raw.clone();
    }

    let mut out = pick(raw, GUIDE_POST_FIELDS);
    let lawyer = match raw.get("lawyer") {
        Some(lawyer) if !lawyer.is_null() => json!({
            "_id": field(lawyer, "_id"),
            "name": field(lawyer, "name"),
            "role": field(lawyer, "role"),
        }),
        _ => Value::Null,
    };
    out.insert("lawyer".to_string(), lawyer);
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Value {
        json!({
            "_id": "q1",
            "title": "전세 보증금 반환",
            "body": "집주인이 보증금을 돌려주지 않습니다",
            "updatedAt": "2025-06-01T00:00:00.000Z",
            "modelType": "qna",
            "internal": "drop me",
            "answers": [{
                "_id": "a1",
                "slug": "a1-slug",
                "lawyer": { "_id": "l1", "role": "lawyer", "name": "김변호사" },
                "body": [{
                    "content": {
                        "_id": "c1",
                        "answer": "a1",
                        "body": "내용증명을 보내세요",
                        "number": 1,
                        "extra": true
                    }
                }]
            }]
        })
    }

    #[test]
    fn test_simple_question() {
        let out = question(&sample_question(), true);
        assert_eq!(out["_id"], "q1");
        assert_eq!(out["categories"], json!([]));
        assert!(out.get("internal").is_none());
        assert!(out.get("modelType").is_none());

        let answer = &out["answers"][0];
        assert_eq!(answer["lawyer"], "l1");
        assert_eq!(answer["role"], "lawyer");
        assert_eq!(answer["body"][0]["body"], "내용증명을 보내세요");
        assert!(answer["body"][0].get("extra").is_none());
        assert!(answer.get("slug").is_none());
    }

    #[test]
    fn test_detail_question() {
        let out = question(&sample_question(), false);
        assert_eq!(out["modelType"], "qna");
        assert_eq!(out["aiResponse"], json!({}));
        assert!(out["focusAdCategories"].is_null());

        let answer = &out["answers"][0];
        assert_eq!(answer["lawyer"]["name"], "김변호사");
        assert_eq!(answer["slug"], "a1-slug");
        assert_eq!(answer["body"]["content"][0]["number"], 1);
    }

    #[test]
    fn test_question_without_answers() {
        let out = question(&json!({ "_id": "q2" }), true);
        assert_eq!(out["answers"], json!([]));
    }

    #[test]
    fn test_guide_post_simple_and_detail() {
        let raw = json!({
            "_id": "p1",
            "title": "임대차 가이드",
            "lawyer": { "_id": "l1", "name": "이변호사", "role": "lawyer", "phone": "010" },
            "viewCount": 42
        });

        let simple = guide_post(&raw, true);
        assert_eq!(simple["lawyer"], json!({ "_id": "l1", "name": "이변호사", "role": "lawyer" }));
        assert_eq!(simple["htmlContent"], "");
        assert!(simple.get("viewCount").is_none());

        let detail = guide_post(&raw, false);
        assert_eq!(detail, raw);

        let no_lawyer = guide_post(&json!({ "_id": "p2" }), true);
        assert!(no_lawyer["lawyer"].is_null());
    }
}
