//! # Script 测试
//!
//! 分类规则与整行解析流程的测试。

use super::*;
use crate::line::Category;

fn parse(raw: &str) -> ScriptLine {
    ScriptParser::new("Marco").parse_line("a1s1", 0, raw)
}

// -------------------------------------------------------------------------
// 分类规则
// -------------------------------------------------------------------------

#[test]
fn test_classify_prefix_rules() {
    assert_eq!(classify("# author note").category, Category::EngineComment);
    assert_eq!(classify("$ renpy.pause(1.0)").category, Category::EngineInlineCode);
    assert_eq!(classify("jump chapter2").category, Category::EngineDirective);
    assert_eq!(classify("").category, Category::EngineDirective);
    assert_eq!(classify("if affection > 3:").category, Category::ChoiceCondition);
    assert_eq!(classify("else:").category, Category::ChoiceCondition);
}

#[test]
fn test_engine_keywords_are_prefix_matches() {
    for keyword in ENGINE_KEYWORDS {
        assert_eq!(
            classify(&format!("{} something", keyword)).category,
            Category::EngineDirective,
            "keyword {}",
            keyword
        );
    }
    // 前缀匹配：`without` 以 `with` 开头
    assert_eq!(classify("without").category, Category::EngineDirective);
}

#[test]
fn test_condition_keyword_needs_trailing_space() {
    // `iffy` 不是条件
    assert_eq!(classify("iffy").category, Category::Unknown);
}

#[test]
fn test_classify_dialogue_alias() {
    let c = classify(r#"ca "We leave at dawn.""#);
    assert_eq!(c.category, Category::DialogueAlias);
    assert_eq!(c.speaker.as_deref(), Some("ca"));
    assert_eq!(c.text, "We leave at dawn.");
}

#[test]
fn test_classify_dialogue_alias_requires_lowercase() {
    let c = classify(r#"Ca "We leave at dawn.""#);
    assert_eq!(c.category, Category::Unknown);
    assert_eq!(c.speaker, None);
    assert_eq!(c.text, r#"Ca "We leave at dawn.""#);
}

#[test]
fn test_classify_dialogue_name() {
    let c = classify(r#""Guard" "Halt!""#);
    assert_eq!(c.category, Category::DialogueName);
    assert_eq!(c.speaker.as_deref(), Some("Guard"));
    assert_eq!(c.text, "Halt!");
}

#[test]
fn test_classify_dialogue_unspecified_before_internal() {
    let c = classify(r#"""Who's there?"""#);
    assert_eq!(c.category, Category::DialogueUnspecified);
    assert_eq!(c.speaker.as_deref(), Some(SPEAKER_UNSPECIFIED));
    assert_eq!(c.text, r#""Who's there?""#);
}

#[test]
fn test_classify_dialogue_internal() {
    let c = classify(r#""The sea is calm tonight.""#);
    assert_eq!(c.category, Category::DialogueInternal);
    assert_eq!(c.speaker.as_deref(), Some(SPEAKER_INTERNAL));
    assert_eq!(c.text, "The sea is calm tonight.");
}

#[test]
fn test_classify_choice_player() {
    let c = classify(r#""Should I go?":"#);
    assert_eq!(c.category, Category::ChoicePlayer);
    assert_eq!(c.speaker, None);
    assert_eq!(c.text, "Should I go?");
}

#[test]
fn test_classify_unknown_keeps_line() {
    let c = classify("menu_option = 3");
    assert_eq!(c.category, Category::EngineDirective);

    let c = classify("define a = Character('Amicus')");
    assert_eq!(c.category, Category::Unknown);
    assert_eq!(c.speaker, None);
    assert_eq!(c.text, "define a = Character('Amicus')");
}

#[test]
fn test_classify_is_total() {
    let inputs = [
        "",
        "\"",
        "\"\"",
        "\"\":",
        "\" \"",
        "m \"\"",
        "::",
        "「台词」",
        "\"unterminated",
        "    ",
    ];
    for input in inputs {
        let c = classify(&clean(input, "Marco"));
        assert!(Category::ALL.contains(&c.category));
    }
}

// -------------------------------------------------------------------------
// 整行解析
// -------------------------------------------------------------------------

#[test]
fn test_parse_alias_dialogue_line() {
    let line = parse("m \"Hello there.\"\n");
    assert_eq!(line.category, Category::DialogueAlias);
    assert_eq!(line.speaker.as_deref(), Some("marco"));
    assert_eq!(line.line, "Hello there.");
    assert!(line.is_read);
    assert!(line.has_speaker);
    assert!(!line.is_branch);
    assert_eq!(line.raw, "m \"Hello there.\"\n");
}

#[test]
fn test_parse_indented_choice() {
    let line = parse("    \"Should I go?\":\n");
    assert_eq!(line.category, Category::ChoicePlayer);
    assert!(line.is_choice);
    assert!(!line.is_branch);
    assert_eq!(line.line, "Should I go?");
    assert_eq!(line.speaker, None);
}

#[test]
fn test_parse_nested_branch_internal() {
    let line = parse("        \"I guess so.\"\n");
    assert_eq!(line.category, Category::DialogueInternal);
    assert_eq!(line.speaker.as_deref(), Some("internal"));
    assert!(line.is_branch);
    assert!(line.is_read);
    assert!(!line.has_speaker);
}

#[test]
fn test_parse_comment() {
    let line = parse("# author note\n");
    assert_eq!(line.category, Category::EngineComment);
    assert!(line.is_renpy);
    assert!(!line.is_read);
    assert!(!line.is_choice);
}

#[test]
fn test_parse_directive() {
    let line = parse("jump chapter2\n");
    assert_eq!(line.category, Category::EngineDirective);
    assert!(line.is_renpy);
}

#[test]
fn test_parse_named_dialogue_lowercases_speaker() {
    let line = parse("\"Unknown\" \"Who's there?\"\n");
    assert_eq!(line.category, Category::DialogueName);
    assert_eq!(line.speaker.as_deref(), Some("unknown"));
    assert_eq!(line.line, "Who's there?");
    assert!(line.has_speaker);
}

#[test]
fn test_parse_substitutes_main_character_in_text() {
    let mut parser = ScriptParser::new("Nico");
    let line = parser.parse_line("a1s1", 7, "    a \"{i}[mc]{/i}, wake up.\"\n");
    assert_eq!(line.speaker.as_deref(), Some("amicus"));
    assert_eq!(line.line, "*Nico*, wake up.");
    assert!(line.is_branch);
    assert_eq!(line.line_idx, 7);
}

#[test]
fn test_speaker_presence_matches_category() {
    let raws = [
        "m \"Hi.\"",
        "\"Guard\" \"Halt!\"",
        "\"\\\"Hey!\\\"\"",
        "\"Quiet.\"",
        "\"Leave\":",
        "# note",
        "what is this",
    ];
    for raw in raws {
        let line = parse(raw);
        assert_eq!(line.speaker.is_some(), line.category.is_dialogue(), "{}", raw);
        if line.has_speaker {
            assert!(line.speaker.is_some());
        }
    }
}

#[test]
fn test_parse_text_preserves_lines_and_counts_unknown() {
    let text = "label start:\n    m \"Hi.\"\n???\n\"Done.\"";
    let mut parser = ScriptParser::new("Marco");
    let lines = parser.parse_text("a1s1", text);

    assert_eq!(lines.len(), 4);
    for (idx, line) in lines.iter().enumerate() {
        assert_eq!(line.line_idx, idx);
        assert_eq!(line.file, "a1s1");
    }
    assert_eq!(lines[0].raw, "label start:\n");
    assert_eq!(lines[3].raw, "\"Done.\"");
    assert_eq!(lines[2].category, Category::Unknown);
    assert_eq!(parser.unknown_count(), 1);
}

#[test]
fn test_parse_text_empty_file() {
    let mut parser = ScriptParser::default();
    assert!(parser.parse_text("empty", "").is_empty());
    assert_eq!(parser.main_character(), DEFAULT_MAIN_CHARACTER);
}

#[test]
fn test_parse_text_normalizes_crlf() {
    let mut parser = ScriptParser::new("Marco");
    let lines = parser.parse_text("a1s1", "label a1s1:\r\nm \"Hi.\"\r\n\"Quiet.\"\r");

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].raw, "m \"Hi.\"\n");
    assert_eq!(lines[2].raw, "\"Quiet.\"\n");
    assert_eq!(lines[1].line, "Hi.");
    assert!(lines.iter().all(|l| !l.raw.contains('\r')));
}
