use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::categories::{find_category, get_category};
use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Category, MatchRule, MatchType, Payee};

/// A rule plus its compiled regex, when it is a regex rule that compiles.
struct LoadedRule {
    rule: MatchRule,
    regex: Option<Regex>,
}

/// Why a payee got its category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchSource {
    Payee(i64),
    Rule(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMatch {
    pub category_id: i64,
    pub source: MatchSource,
}

fn compile_rule_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    // Anchored at the start only, like a prefix match that understands patterns.
    Regex::new(&format!("(?i)^(?:{pattern})"))
}

/// `payee` must already be lowercased and trimmed.
fn matches(payee: &str, pattern: &str, match_type: MatchType, regex: Option<&Regex>) -> bool {
    let pattern = pattern.to_lowercase();
    match match_type {
        MatchType::Contains => payee.contains(&pattern),
        MatchType::StartsWith => payee.starts_with(&pattern),
        MatchType::Exact => payee == pattern,
        MatchType::Regex => regex.map(|re| re.is_match(payee)).unwrap_or(false),
    }
}

/// Payee and rule based categorization. Rules are loaded once, highest
/// priority first; reload after editing rules.
pub struct Categorizer {
    rules: Vec<LoadedRule>,
}

impl Categorizer {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT r.id, r.pattern, r.match_type, p.default_category_id \
             FROM payee_match_rules r JOIN payees p ON r.payee_id = p.id \
             ORDER BY r.priority DESC, r.id",
        )?;
        let rules = stmt
            .query_map([], |row| {
                Ok(MatchRule {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    match_type: row.get(2)?,
                    category_id: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = if rule.match_type == MatchType::Regex {
                    match compile_rule_regex(&rule.pattern) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(rule_id = rule.id, pattern = %rule.pattern, error = %e, "invalid regex rule never matches");
                            None
                        }
                    }
                } else {
                    None
                };
                LoadedRule { rule, regex }
            })
            .collect();
        Ok(Self { rules })
    }

    /// 1. a payee with exactly this name and a default category,
    /// 2. the first matching rule whose payee has a default category,
    /// 3. nothing.
    pub fn categorize(&self, conn: &Connection, payee_name: &str) -> Result<Option<CategoryMatch>> {
        let raw = payee_name.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        // SQLite's lower() only folds ASCII, so both sides go through it.
        let known: Option<(i64, i64)> = conn
            .query_row(
                "SELECT id, default_category_id FROM payees \
                 WHERE lower(name) = lower(?1) AND default_category_id IS NOT NULL AND auto_categorize = 1",
                [raw],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((payee_id, category_id)) = known {
            debug!(payee = raw, payee_id, "matched known payee");
            return Ok(Some(CategoryMatch {
                category_id,
                source: MatchSource::Payee(payee_id),
            }));
        }

        let payee = raw.to_lowercase();
        for loaded in &self.rules {
            let rule = &loaded.rule;
            let Some(category_id) = rule.category_id else {
                continue;
            };
            if matches(&payee, &rule.pattern, rule.match_type, loaded.regex.as_ref()) {
                debug!(payee = %payee, rule_id = rule.id, pattern = %rule.pattern, "matched rule");
                return Ok(Some(CategoryMatch {
                    category_id,
                    source: MatchSource::Rule(rule.id),
                }));
            }
        }
        Ok(None)
    }

    /// Categorize and, for rule matches, count the hit.
    pub fn categorize_and_record(&self, conn: &Connection, payee_name: &str) -> Result<Option<i64>> {
        let found = self.categorize(conn, payee_name)?;
        if let Some(CategoryMatch {
            source: MatchSource::Rule(rule_id),
            ..
        }) = found
        {
            conn.execute(
                "UPDATE payee_match_rules SET hit_count = hit_count + 1 WHERE id = ?1",
                [rule_id],
            )?;
        }
        Ok(found.map(|m| m.category_id))
    }
}

fn find_payee(conn: &Connection, name: &str) -> Result<Option<Payee>> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM payees WHERE lower(name) = lower(?1)",
            [name.trim()],
            |row| {
                Ok(Payee {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?)
}

/// Point `name` at `category_id`, creating the payee if needed.
/// Returns the payee and whether it was created.
fn upsert_payee(conn: &Connection, name: &str, category_id: i64) -> Result<(Payee, bool)> {
    if let Some(payee) = find_payee(conn, name)? {
        conn.execute(
            "UPDATE payees SET default_category_id = ?1 WHERE id = ?2",
            rusqlite::params![category_id, payee.id],
        )?;
        return Ok((payee, false));
    }
    conn.execute(
        "INSERT INTO payees (name, default_category_id, auto_categorize, created_at) VALUES (?1, ?2, 1, ?3)",
        rusqlite::params![name.trim(), category_id, now_timestamp()],
    )?;
    Ok((
        Payee {
            id: conn.last_insert_rowid(),
            name: name.trim().to_string(),
        },
        true,
    ))
}

/// Find or create a payee by name with no default category.
pub fn find_or_create_payee(conn: &Connection, name: &str) -> Result<Payee> {
    if let Some(payee) = find_payee(conn, name)? {
        return Ok(payee);
    }
    conn.execute(
        "INSERT INTO payees (name, auto_categorize, created_at) VALUES (?1, 1, ?2)",
        rusqlite::params![name.trim(), now_timestamp()],
    )?;
    Ok(Payee {
        id: conn.last_insert_rowid(),
        name: name.trim().to_string(),
    })
}

pub struct CreatedRule {
    pub id: i64,
    pub category: Category,
}

/// First free `Rule: {pattern}` name, suffixed ` (2)`, ` (3)`... when taken.
fn rule_payee_name(conn: &Connection, pattern: &str) -> Result<String> {
    let base = format!("Rule: {pattern}");
    let mut name = base.clone();
    let mut n = 2;
    while find_payee(conn, &name)?.is_some() {
        name = format!("{base} ({n})");
        n += 1;
    }
    Ok(name)
}

/// Each rule hangs off its own synthetic payee named `Rule: {pattern}` that
/// carries the target category. Existing rules keep their categories.
pub fn create_rule(
    conn: &Connection,
    pattern: &str,
    category_name: &str,
    match_type: MatchType,
    priority: i64,
) -> Result<CreatedRule> {
    if pattern.trim().is_empty() {
        return Err(ZeroedError::Other("Rule pattern is required".into()));
    }
    if match_type == MatchType::Regex {
        compile_rule_regex(pattern)
            .map_err(|e| ZeroedError::Other(format!("Invalid regex '{pattern}': {e}")))?;
    }
    let category = find_category(conn, category_name)?;
    let (payee, _) = upsert_payee(conn, &rule_payee_name(conn, pattern)?, category.id)?;
    conn.execute(
        "INSERT INTO payee_match_rules (payee_id, pattern, match_type, priority) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![payee.id, pattern, match_type, priority],
    )?;
    debug!(pattern, category = %category.name, "created rule");
    Ok(CreatedRule {
        id: conn.last_insert_rowid(),
        category,
    })
}

pub fn delete_rule(conn: &Connection, id: i64) -> Result<String> {
    let pattern: String = conn
        .query_row("SELECT pattern FROM payee_match_rules WHERE id = ?1", [id], |row| row.get(0))
        .optional()?
        .ok_or(ZeroedError::UnknownRule(id))?;
    conn.execute("DELETE FROM payee_match_rules WHERE id = ?1", [id])?;
    Ok(pattern)
}

pub struct RuleRow {
    pub id: i64,
    pub pattern: String,
    pub match_type: MatchType,
    pub category: Option<String>,
    pub priority: i64,
    pub hit_count: i64,
}

pub fn list_rules(conn: &Connection) -> Result<Vec<RuleRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.pattern, r.match_type, c.name, r.priority, r.hit_count \
         FROM payee_match_rules r \
         JOIN payees p ON r.payee_id = p.id \
         LEFT JOIN categories c ON p.default_category_id = c.id \
         ORDER BY r.priority DESC, r.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RuleRow {
                id: row.get(0)?,
                pattern: row.get(1)?,
                match_type: row.get(2)?,
                category: row.get(3)?,
                priority: row.get(4)?,
                hit_count: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remember a manual categorization so future imports of this payee follow it.
pub fn learn(conn: &Connection, payee_name: &str, category_id: i64) -> Result<Payee> {
    let (payee, _) = upsert_payee(conn, payee_name, category_id)?;
    Ok(payee)
}

/// Set a payee's default category by category name. Returns whether the
/// payee was newly created.
pub fn set_payee(conn: &Connection, payee_name: &str, category_name: &str) -> Result<(Payee, Category, bool)> {
    if payee_name.trim().is_empty() {
        return Err(ZeroedError::Other("Payee name is required".into()));
    }
    let category = find_category(conn, category_name)?;
    let (payee, created) = upsert_payee(conn, payee_name, category.id)?;
    Ok((payee, category, created))
}

pub struct PayeeRow {
    pub name: String,
    pub category: String,
    pub auto_categorize: bool,
}

pub fn list_payees(conn: &Connection) -> Result<Vec<PayeeRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.name, c.name, p.auto_categorize FROM payees p \
         JOIN categories c ON p.default_category_id = c.id ORDER BY p.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PayeeRow {
                name: row.get(0)?,
                category: row.get(1)?,
                auto_categorize: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Categories of payees whose names share the first five characters of
/// `payee_name`, without repeats.
pub fn suggest_categories(conn: &Connection, payee_name: &str, limit: usize) -> Result<Vec<Category>> {
    if payee_name.chars().count() < 3 {
        return Ok(Vec::new());
    }
    let prefix: String = payee_name.chars().take(5).collect();
    let mut stmt = conn.prepare(
        "SELECT default_category_id FROM payees \
         WHERE instr(lower(name), lower(?1)) > 0 AND default_category_id IS NOT NULL \
         ORDER BY id LIMIT ?2",
    )?;
    let ids = stmt
        .query_map(rusqlite::params![prefix, limit as i64], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut seen = Vec::new();
    let mut categories = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
            categories.push(get_category(conn, id)?);
        }
    }
    Ok(categories)
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub still_uncategorized: usize,
}

/// Re-run payees and rules over every uncategorized transaction.
pub fn categorize_uncategorized(conn: &Connection) -> Result<CategorizeResult> {
    let categorizer = Categorizer::load(conn)?;
    let mut stmt = conn.prepare(
        "SELECT t.id, COALESCE(t.raw_payee_name, p.name, '') FROM transactions t \
         LEFT JOIN payees p ON t.payee_id = p.id WHERE t.category_id IS NULL",
    )?;
    let pending: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut categorized = 0usize;
    let mut still_uncategorized = 0usize;
    let tx = conn.unchecked_transaction()?;
    for (txn_id, payee) in &pending {
        match categorizer.categorize_and_record(&tx, payee)? {
            Some(category_id) => {
                tx.execute(
                    "UPDATE transactions SET category_id = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![category_id, now_timestamp(), txn_id],
                )?;
                categorized += 1;
            }
            None => still_uncategorized += 1,
        }
    }
    tx.commit()?;

    Ok(CategorizeResult {
        categorized,
        still_uncategorized,
    })
}
