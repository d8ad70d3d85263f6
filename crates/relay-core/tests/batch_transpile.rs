use std::fs;
use std::path::Path;

use anyhow::Result;
use pretty_assertions::assert_eq;
use relay_core::{BatchOutcome, BatchTranspiler, CommandCategory, DiagnosticCategory, TranspileConfig};

fn implemented(name: &str) -> String {
    format!(
        "/** @command {name} */\n\
         export default function run(processContext, ...args) {{\n\
         \x20 const result = processContext.call({name:?}, args);\n\
         \x20 processContext.trace(result);\n\
         \x20 return result;\n\
         }}\n"
    )
}

fn write_tree(root: &Path, files: &[(&str, String)]) -> Result<()> {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

fn command_library(root: &Path) -> Result<()> {
    write_tree(
        root,
        &[
            ("db/ALL.js", implemented("ALL")),
            ("db/ALL_RECORDS.js", implemented("ALL RECORDS")),
            ("ui/ALERT.js", implemented("ALERT")),
            ("string/Length.js", implemented("Length")),
            (
                "io/SEND_PACKET.js",
                "// @command SEND PACKET\n// not implemented\nexport default function SEND_PACKET() {}\n".to_string(),
            ),
            (
                "debug/TRACE.js",
                "/** @command TRACE\n * @runtime-only\n */\nexport default function TRACE() {}\n".to_string(),
            ),
        ],
    )
}

fn transpile(sources: &[(&str, &str)], config: TranspileConfig) -> Result<BatchOutcome> {
    let input = tempfile::tempdir()?;
    let commands = tempfile::tempdir()?;
    command_library(commands.path())?;
    let files: Vec<(&str, String)> = sources.iter().map(|(p, s)| (*p, s.to_string())).collect();
    write_tree(input.path(), &files)?;
    Ok(BatchTranspiler::new(config).run(input.path(), commands.path())?)
}

fn code<'o>(outcome: &'o BatchOutcome, path: &str) -> &'o str {
    outcome.module(path).map(|m| m.code.as_str()).unwrap_or_default()
}

#[test]
fn test_registry_built_from_library() -> Result<()> {
    let outcome = transpile(&[("Main.4dm", "ALERT:C41(\"x\")")], TranspileConfig::default())?;
    let counts = &outcome.registry_report.counts_by_category;
    assert_eq!(counts[&CommandCategory::Implemented], 4);
    assert_eq!(counts[&CommandCategory::Placeholder], 1);
    assert_eq!(counts[&CommandCategory::RuntimeOnly], 1);
    assert!(counts[&CommandCategory::SimpleInline] > 0);
    assert!(outcome.registry_report.unused.contains(&"ALL RECORDS".to_string()));
    assert!(!outcome.registry_report.unused.contains(&"ALERT".to_string()));
    Ok(())
}

#[test]
fn test_longest_match_prefers_multi_word_command() -> Result<()> {
    let outcome = transpile(
        &[("Main.4dm", "ALL RECORDS([People])\nALL([People])")],
        TranspileConfig::default(),
    )?;
    let code = code(&outcome, "Main.js");
    assert!(code.contains("ALL_RECORDS(processContext, processContext.db.People)"), "{code}");
    assert!(code.contains("\nALL(processContext, processContext.db.People)"), "{code}");
    assert!(code.contains("import ALL from \"./runtime/commands/db/ALL.js\";"));
    assert!(code.contains("import ALL_RECORDS from \"./runtime/commands/db/ALL_RECORDS.js\";"));
    assert_eq!(outcome.error_count(), 0);
    Ok(())
}

#[test]
fn test_unresolved_command_does_not_abort_file() -> Result<()> {
    let mut lines: Vec<String> = (0..9).map(|i| format!("ALERT:C41(\"step {i}\")")).collect();
    lines.insert(4, "BEEP:C151".to_string());
    let source = lines.join("\n");

    let outcome = transpile(&[("Steps.4dm", source.as_str())], TranspileConfig::default())?;
    let code = code(&outcome, "Steps.js");
    assert_eq!(code.matches("ALERT(processContext, \"step").count(), 9);
    assert_eq!(code.matches("processContext.unresolvedCommand(\"BEEP\")(processContext)").count(), 1);
    assert_eq!(outcome.error_count(), 0);
    assert_eq!(outcome.warning_count(), 1);
    assert_eq!(outcome.report.count(DiagnosticCategory::UnresolvedCommand), 1);
    assert_eq!(outcome.registry_report.unresolved.get("BEEP"), Some(&1));
    Ok(())
}

#[test]
fn test_broken_file_is_isolated() -> Result<()> {
    let outcome = transpile(
        &[
            ("Good.4dm", "ALERT:C41(\"fine\")"),
            ("Broken.4dm", "$s:=\"never closed\nALERT:C41($s)"),
        ],
        TranspileConfig::default().with_threads(2).with_chunk_size(1),
    )?;
    assert_eq!(outcome.modules.len(), 2);
    assert!(code(&outcome, "Good.js").contains("ALERT(processContext, \"fine\")"));
    assert_eq!(outcome.error_count(), 1);
    let error = outcome
        .report
        .diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| (d.category, d.file.clone()));
    assert_eq!(error, Some((DiagnosticCategory::Lexical, Some("Broken.4dm".to_string()))));
    assert_eq!(outcome.statistics.files_with_errors, 1);
    assert_eq!(outcome.statistics.files_transformed, 2);
    Ok(())
}

#[test]
fn test_output_is_independent_of_scheduling() -> Result<()> {
    let sources = [
        ("A.4dm", "ALERT:C41(Length:C16($1))\nB"),
        ("B.4dm", "If ($1=\"\")\nALL RECORDS([T])\nEnd if"),
        ("sub/C.4dm", "MISSING:C999\nA($1; $2)"),
        ("sub/D.4dm", "$x{0}:=1\nFor ($i;1;3)\nEnd while"),
    ];
    let serial = transpile(&sources, TranspileConfig::default().with_threads(1).with_chunk_size(64))?;
    let parallel = transpile(&sources, TranspileConfig::default().with_threads(4).with_chunk_size(1))?;

    let modules = |outcome: &BatchOutcome| -> Vec<(String, String)> {
        outcome
            .modules
            .iter()
            .map(|m| (m.output_path.display().to_string(), m.code.clone()))
            .collect()
    };
    assert_eq!(modules(&serial), modules(&parallel));
    assert_eq!(serial.report.diagnostics, parallel.report.diagnostics);
    assert_eq!(
        serde_json::to_value(&serial.registry_report.commands)?,
        serde_json::to_value(&parallel.registry_report.commands)?
    );
    Ok(())
}

#[test]
fn test_array_indices_rebased() -> Result<()> {
    let outcome = transpile(
        &[("Arrays.4dm", "$a{1}:=$b{$i}\n$c:=$d{0}\n$e:=$grid{2}{3}")],
        TranspileConfig::default(),
    )?;
    let code = code(&outcome, "Arrays.js");
    assert!(code.contains("$a[0]=$b[$i]"), "{code}");
    assert!(code.contains("$c=$d{0}"), "{code}");
    assert!(code.contains("$e=$grid[1][2]"), "{code}");
    assert_eq!(outcome.report.count(DiagnosticCategory::InvalidIndex), 1);
    Ok(())
}

#[test]
fn test_quoted_text_is_never_rewritten() -> Result<()> {
    let source = "ALERT:C41(\"OK\")\nIf (OK=1)\n  ALERT:C41(\"Done: OK & True\")\nEnd if";
    let outcome = transpile(&[("Quotes.4dm", source)], TranspileConfig::default())?;
    let code = code(&outcome, "Quotes.js");
    assert!(code.contains("ALERT(processContext, \"OK\")"), "{code}");
    assert!(code.contains("if (processContext.OK===1) {"), "{code}");
    assert!(code.contains("ALERT(processContext, \"Done: OK & True\")"), "{code}");
    Ok(())
}

#[test]
fn test_sibling_methods_and_flagged_commands() -> Result<()> {
    let outcome = transpile(
        &[
            ("Main.4dm", "C_TEXT($0)\n$0:=FormatName($1)\nSEND PACKET:C103($doc; $0)\nTRACE:C157\nMain($1)"),
            ("util/FormatName.4dm", "$0:=Length:C16($1)\nMain(\"x\")"),
        ],
        TranspileConfig::default().with_parameter_count(1),
    )?;

    assert_eq!(
        code(&outcome, "Main.js"),
        "// Generated by relay from Main.4dm. Do not edit.\n\
         import FormatName from \"./util/FormatName.js\";\n\
         import SEND_PACKET from \"./runtime/commands/io/SEND_PACKET.js\";\n\
         \n\
         export default function Main(processContext, $1) {\n\
         let $0 = \"\";\n\
         $0=FormatName(processContext, $1)\n\
         SEND_PACKET(processContext, $doc, $0)\n\
         processContext.runtime.TRACE(processContext)\n\
         Main(processContext, $1)\n\
         return $0;\n\
         }\n"
    );
    let helper = code(&outcome, "util/FormatName.js");
    assert!(helper.contains("import LENGTH from \"../runtime/commands/string/Length.js\";"), "{helper}");
    assert!(helper.contains("import Main from \"../Main.js\";"), "{helper}");
    assert!(helper.contains("let $0;\n$0=LENGTH(processContext, $1)"), "{helper}");

    assert_eq!(outcome.report.count(DiagnosticCategory::PlaceholderCommand), 1);
    assert_eq!(outcome.error_count(), 0);
    Ok(())
}

#[test]
fn test_bare_methods_loops_and_element_access() -> Result<()> {
    let outcome = transpile(
        &[
            (
                "Main.4dm",
                "If (IsValid)\n  For each ($row; $rows)\n    $v:=$row[1]\n    $n:=Count+1\n  End for each\nEnd if",
            ),
            ("IsValid.4dm", "$0:=True"),
            ("Count.4dm", "$0:=1"),
        ],
        TranspileConfig::default().with_parameter_count(0),
    )?;
    let code = code(&outcome, "Main.js");
    assert!(code.contains("import Count from \"./Count.js\";\nimport IsValid from \"./IsValid.js\";"), "{code}");
    assert!(
        code.contains(
            "if (IsValid(processContext)) {\n  for (let $row of $rows) {\n    $v=$row[1]\n    $n=Count(processContext)+1\n  }\n}"
        ),
        "{code}"
    );
    assert_eq!(outcome.error_count(), 0);
    assert_eq!(outcome.warning_count(), 0);
    Ok(())
}

#[test]
fn test_written_output_tree() -> Result<()> {
    let input = tempfile::tempdir()?;
    let commands = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    command_library(commands.path())?;
    write_tree(input.path(), &[("forms/Open.4dm", "ALERT:C41(\"open\")".to_string())])?;

    let config = TranspileConfig::default().with_position_maps(true);
    let outcome = BatchTranspiler::new(config).run(input.path(), commands.path())?;
    outcome.write(out.path(), true)?;

    let module = fs::read_to_string(out.path().join("forms/Open.js"))?;
    assert!(module.contains("import ALERT from \"../runtime/commands/ui/ALERT.js\";"));
    let map: serde_json::Value = serde_json::from_str(&fs::read_to_string(out.path().join("forms/Open.js.map.json"))?)?;
    assert_eq!(map["mappings"][0]["original"]["line"], 1);

    let stats: serde_json::Value = serde_json::from_str(&fs::read_to_string(out.path().join("statistics-report.json"))?)?;
    assert_eq!(stats["files_processed"], 1);
    assert!(stats["passes"]["calls"].is_object());
    Ok(())
}
