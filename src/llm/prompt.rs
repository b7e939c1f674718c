//! Prompts sent to Atlas.

use crate::llm::types::Message;

/// System prompt for SQL generation. Describes the single `forex_bars` table.
const SQL_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that generates ONLY SQL queries for PostgreSQL.

The database has one table called `forex_bars` with the following columns:
- "datetime" (timestamp): the time of the forex bar
- open (float): opening price
- high (float): highest price
- low (float): lowest price
- close (float): closing price
- volume (float): trading volume
- pip_hl (float): pip difference (high - low)
- pip_oc (float): pip difference (close - open)
- confidence_score (float): numeric confidence value
- confidence_tag (text): category label
- id (int)
- symbol (text)

Available parameters (use them as written, never inline their values):
- :start_date, :end_date (date): the selected date range
- :threshold_pips (int): spike threshold in pips
- :min_gap_pips (int): minimum opening gap in pips
- :min_daily_pips (int): minimum daily range in pips

Rules:
1. Use only these columns. Do not invent new ones.
2. Always include a filter:
   WHERE CAST("datetime" AS date) BETWEEN :start_date AND :end_date
   (unless the user explicitly provides their own filter).
3. Return ONLY SQL in a ```sql ... ``` code block. No explanations.
4. Use ONLY this table (forex_bars).
5. Write a single read-only SELECT statement.
6. Always return plain SQL, no comments.
7. Prefer aliases for clarity if needed."#;

/// Messages asking Atlas to write SQL for `question`.
pub fn sql_messages(question: &str) -> Vec<Message> {
    vec![
        Message::system(SQL_SYSTEM_PROMPT),
        Message::user(question.trim()),
    ]
}

/// Messages asking for a short, non-technical reading of `question`.
pub fn interpretation_messages(question: &str) -> Vec<Message> {
    vec![Message::user(format!(
        "Explain in 3-6 sentences what the following FX analytics request means in business terms. \
         Avoid SQL language. Be specific, action-oriented, and useful for a trader or pricing analyst.\n\n\
         Request:\n{}",
        question.trim()
    ))]
}

/// Messages asking for a few reference URLs about `topic`.
pub fn links_messages(topic: &str) -> Vec<Message> {
    vec![Message::user(format!(
        "Give 2-3 credible, directly relevant webpages (full URLs) where someone can learn more about \
         this topic:\n\n{}\n\n\
         Rules:\n\
         - ONLY output raw URLs, one per line (no text, no markdown).\n\
         - Prefer authoritative sources (babypips, fxstreet, investopedia).\n\
         - Links must be directly about the topic, not generic homepages.",
        topic.trim()
    ))]
}
