//! Declarative structural rules and the engine that evaluates them.
//!
//! Both the validator and the confidence scorer read from one table of
//! `(pattern, category, weight, strength)` rules. Which patterns win is a
//! data change here, not a code change in either consumer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

/// Structural class a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// `1.`, `1.2`, `3、` style markers.
    NumberedSection,
    /// Chapter/part/section words in any supported language.
    ChapterWord,
    /// `IV.` style markers.
    RomanNumeral,
    /// `a)`, `B.` style markers.
    LetteredSection,
    /// Trailing page numbers with leaders.
    PageTrailer,
    /// Preface, appendix, bibliography and friends.
    FrontBackMatter,
    /// Navigation chrome, empty-search notices, pagination, promo lists.
    Blacklist,
}

/// One declarative rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    /// Stable rule name used in diagnostics.
    pub name: &'static str,
    /// Regex source.
    pub pattern: &'static str,
    /// Structural class.
    pub category: RuleCategory,
    /// Relative weight, used by line-level scanning.
    pub weight: f64,
    /// Strong rules satisfy the validator's structural requirement.
    pub strong: bool,
}

impl Rule {
    const fn strong(name: &'static str, pattern: &'static str, category: RuleCategory, weight: f64) -> Self {
        Self { name, pattern, category, weight, strong: true }
    }

    const fn weak(name: &'static str, pattern: &'static str, category: RuleCategory, weight: f64) -> Self {
        Self { name, pattern, category, weight, strong: false }
    }

    const fn blacklist(name: &'static str, pattern: &'static str) -> Self {
        Self { name, pattern, category: RuleCategory::Blacklist, weight: 0.0, strong: false }
    }
}

/// The default rule table.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule::strong(
        "numbered_section",
        r"(?m)^\s*\d{1,3}(?:\.\d{1,3})*(?:[.、:：)）]|\s)\s*\S",
        RuleCategory::NumberedSection,
        1.0,
    ),
    Rule::strong(
        "cjk_chapter",
        r"(?m)^\s*第\s*[一二三四五六七八九十百千零〇两\d]+\s*[章节篇部卷回讲课编]",
        RuleCategory::ChapterWord,
        1.0,
    ),
    Rule::strong(
        "english_chapter",
        r"(?im)^\s*(?:chapter|part|section|book|lesson|unit|volume)\s+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten)\b",
        RuleCategory::ChapterWord,
        1.0,
    ),
    Rule::strong(
        "european_chapter",
        r"(?im)^\s*(?:chapitre|partie|kapitel|teil|abschnitt|cap[ií]tulo|capitolo|parte|hoofdstuk|rozdzia[lł]|глава|часть)\s+\S",
        RuleCategory::ChapterWord,
        1.0,
    ),
    Rule::strong(
        "roman_numeral",
        r"(?m)^\s*[IVXLC]{1,6}[.、:：]\s*\S",
        RuleCategory::RomanNumeral,
        0.8,
    ),
    Rule::strong(
        "front_back_matter",
        r"(?im)^\s*(?:preface|foreword|introduction|prologue|epilogue|afterword|appendix|appendices|bibliography|references|index|acknowledge?ments|glossary|conclusion|pr[ée]face|vorwort|einleitung|anhang|pr[óo]logo|ap[ée]ndice)\b",
        RuleCategory::FrontBackMatter,
        0.8,
    ),
    Rule::strong(
        "cjk_front_back_matter",
        r"(?m)^\s*(?:前言|序言|序|自序|引言|导言|导论|绪论|楔子|后记|跋|附录|参考文献|参考书目|致谢|索引|结语|尾声|译后记)",
        RuleCategory::FrontBackMatter,
        0.8,
    ),
    Rule::weak(
        "lettered_section",
        r"(?m)^\s*[A-Za-z][.)）]\s+\S",
        RuleCategory::LetteredSection,
        0.5,
    ),
    Rule::weak(
        "page_trailer",
        r"(?m)\S(?:\s*[.·…]{2,}\s*|\s{2,}|\t+|\s*/\s*)\d{1,4}\s*$",
        RuleCategory::PageTrailer,
        0.5,
    ),
    Rule::blacklist(
        "no_results",
        r"(?i)no results|nothing found|did not match any|没有找到|未找到相关|搜索结果为空",
    ),
    Rule::blacklist(
        "navigation_chrome",
        r"(?i)sign in to|log in to continue|cookie policy|privacy policy|terms of service|下载豆瓣客户端|登录/注册|豆瓣首页|返回顶部",
    ),
    Rule::blacklist(
        "pagination_only",
        r"(?i)上一页|下一页|[<«‹]\s*前页|后页\s*[>»›]|«\s*previous|next\s*»|page \d+ of \d+",
    ),
    Rule::blacklist(
        "promotional_list",
        r"(?i)的人也喜欢|喜欢读.{0,40}的人|相关推荐|热门标签|豆瓣成员常用的标签|people who (?:liked|bought)|customers who bought|you may also like|recommended for you",
    ),
];

struct CompiledRule {
    rule: Rule,
    regex: Regex,
}

/// A single rule that matched, without the regex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleHit {
    /// Rule name.
    pub name: &'static str,
    /// Rule category.
    pub category: RuleCategory,
    /// Rule weight.
    pub weight: f64,
    /// Whether the rule is strong.
    pub strong: bool,
}

/// Every rule that matched a text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatches {
    hits: Vec<RuleHit>,
}

impl RuleMatches {
    /// All hits, in table order.
    #[must_use]
    pub fn hits(&self) -> &[RuleHit] {
        &self.hits
    }

    /// First blacklist rule that matched.
    #[must_use]
    pub fn blacklist_hit(&self) -> Option<&RuleHit> {
        self.hits.iter().find(|hit| hit.category == RuleCategory::Blacklist)
    }

    /// Returns true if any blacklist rule matched.
    #[must_use]
    pub fn is_blacklisted(&self) -> bool {
        self.blacklist_hit().is_some()
    }

    /// Names of the strong rules that matched.
    #[must_use]
    pub fn strong_rules(&self) -> BTreeSet<&'static str> {
        self.hits.iter().filter(|hit| hit.strong).map(|hit| hit.name).collect()
    }

    /// Categories of the strong rules that matched.
    #[must_use]
    pub fn strong_categories(&self) -> BTreeSet<RuleCategory> {
        self.hits.iter().filter(|hit| hit.strong).map(|hit| hit.category).collect()
    }

    /// Number of distinct structural kinds among the strong matches.
    ///
    /// Language variants of one kind count once, so `Chapter 1` next to
    /// `第一章` is a single kind.
    #[must_use]
    pub fn distinct_strong(&self) -> usize {
        self.strong_categories().len()
    }

    /// Distinct non-blacklist categories that matched.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<RuleCategory> {
        self.hits
            .iter()
            .filter(|hit| hit.category != RuleCategory::Blacklist)
            .map(|hit| hit.category)
            .collect()
    }

    /// Returns true if any rule of the category matched.
    #[must_use]
    pub fn has_category(&self, category: RuleCategory) -> bool {
        self.hits.iter().any(|hit| hit.category == category)
    }
}

/// Evaluates a rule table against text.
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Compiles a rule table. Rules whose pattern fails to compile are
    /// skipped with a warning.
    #[must_use]
    pub fn new(rules: &[Rule]) -> Self {
        let rules = rules
            .iter()
            .filter_map(|rule| match Regex::new(rule.pattern) {
                Ok(regex) => Some(CompiledRule { rule: *rule, regex }),
                Err(err) => {
                    tracing::warn!(rule = rule.name, error = %err, "Skipping invalid structural rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Shared engine over [`DEFAULT_RULES`].
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static ENGINE: OnceLock<Arc<RuleEngine>> = OnceLock::new();
        Arc::clone(ENGINE.get_or_init(|| Arc::new(Self::new(DEFAULT_RULES))))
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule against the whole text.
    #[must_use]
    pub fn evaluate(&self, text: &str) -> RuleMatches {
        let hits = self
            .rules
            .iter()
            .filter(|compiled| compiled.regex.is_match(text))
            .map(|compiled| RuleHit {
                name: compiled.rule.name,
                category: compiled.rule.category,
                weight: compiled.rule.weight,
                strong: compiled.rule.strong,
            })
            .collect();
        RuleMatches { hits }
    }

    /// Sum of weights of non-blacklist rules matching a single line, or
    /// `None` if the line hits the blacklist.
    #[must_use]
    pub fn line_weight(&self, line: &str) -> Option<f64> {
        let mut weight = 0.0;
        for compiled in &self.rules {
            if compiled.regex.is_match(line) {
                if compiled.rule.category == RuleCategory::Blacklist {
                    return None;
                }
                weight += compiled.rule.weight;
            }
        }
        Some(weight)
    }

    /// Returns true if a single line carries a strong structural marker
    /// and no blacklisted content.
    #[must_use]
    pub fn is_structural_line(&self, line: &str) -> bool {
        let mut strong = false;
        for compiled in &self.rules {
            if compiled.regex.is_match(line) {
                if compiled.rule.category == RuleCategory::Blacklist {
                    return false;
                }
                strong |= compiled.rule.strong;
            }
        }
        strong
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.iter().map(|r| r.rule.name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_all_compile() {
        assert_eq!(RuleEngine::shared().len(), DEFAULT_RULES.len());
    }

    #[test]
    fn test_invalid_rule_skipped() {
        let rules = [
            Rule::strong("broken", r"(unclosed", RuleCategory::NumberedSection, 1.0),
            Rule::strong("digits", r"\d", RuleCategory::NumberedSection, 1.0),
        ];
        let engine = RuleEngine::new(&rules);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_numbered_sections() {
        let engine = RuleEngine::shared();
        for text in ["1. Getting Started", "1.2 Ownership", "3、总论", "12) Summary"] {
            let matches = engine.evaluate(text);
            assert!(matches.has_category(RuleCategory::NumberedSection), "{text}");
        }
        assert!(!engine.evaluate("1984 was a year").has_category(RuleCategory::NumberedSection));
    }

    #[test]
    fn test_chapter_words_across_languages() {
        let engine = RuleEngine::shared();
        for text in [
            "第一章 总论",
            "第 12 节 小结",
            "Chapter 3 The Borrow Checker",
            "PART II Advanced Topics",
            "Kapitel 4 Die Methode",
            "Capítulo 1 El comienzo",
        ] {
            assert!(engine.evaluate(text).has_category(RuleCategory::ChapterWord), "{text}");
        }
    }

    #[test]
    fn test_roman_and_front_matter() {
        let engine = RuleEngine::shared();
        assert!(engine.evaluate("IV. Results").has_category(RuleCategory::RomanNumeral));
        assert!(!engine.evaluate("I am a sentence").has_category(RuleCategory::RomanNumeral));
        assert!(engine.evaluate("Preface").has_category(RuleCategory::FrontBackMatter));
        assert!(engine.evaluate("附录A 术语表").has_category(RuleCategory::FrontBackMatter));
    }

    #[test]
    fn test_weak_rules() {
        let engine = RuleEngine::shared();
        let matches = engine.evaluate("a) First point");
        assert!(matches.has_category(RuleCategory::LetteredSection));
        assert_eq!(matches.distinct_strong(), 0);

        assert!(engine.evaluate("Introduction ........ 12").has_category(RuleCategory::PageTrailer));
        assert!(engine.evaluate("Ownership\t45").has_category(RuleCategory::PageTrailer));
    }

    #[test]
    fn test_blacklist() {
        let engine = RuleEngine::shared();
        assert!(engine.evaluate("Sorry, no results for your query").is_blacklisted());
        assert!(engine.evaluate("喜欢读\"三体\"的人也喜欢").is_blacklisted());
        assert!(engine.evaluate("< 前页 1 2 3 后页 >").is_blacklisted());
        assert!(!engine.evaluate("Chapter 1 Loomings").is_blacklisted());
        assert_eq!(
            engine.evaluate("Chapter 1\nno results").blacklist_hit().map(|h| h.name),
            Some("no_results")
        );
    }

    #[test]
    fn test_line_helpers() {
        let engine = RuleEngine::shared();
        assert!(engine.is_structural_line("第三章 线程"));
        assert!(!engine.is_structural_line("Buy this book today"));
        assert!(!engine.is_structural_line("1. 下一页"));
        assert_eq!(engine.line_weight("相关推荐"), None);
        assert!(engine.line_weight("Chapter 1 ....... 3").is_some_and(|w| w > 1.0));
    }

    #[test]
    fn test_distinct_strong_counts_categories() {
        let text = "Preface\n1. Basics\nChapter 2 Depth";
        let matches = RuleEngine::shared().evaluate(text);
        assert_eq!(matches.distinct_strong(), 3);
        assert!(matches.categories().contains(&RuleCategory::FrontBackMatter));

        let bilingual = RuleEngine::shared().evaluate("Chapter 1 Basics\n第一章 基础\nPreface\n前言");
        assert_eq!(
            bilingual.strong_rules(),
            BTreeSet::from(["cjk_chapter", "cjk_front_back_matter", "english_chapter", "front_back_matter"])
        );
        assert_eq!(bilingual.distinct_strong(), 2);
    }
}
