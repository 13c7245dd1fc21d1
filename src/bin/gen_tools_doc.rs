use binja_mcp::{ToolCategory, ToolInfo, TOOL_REGISTRY};
use std::collections::HashMap;
use std::fmt::Write as _;

fn category_title(cat: ToolCategory) -> &'static str {
    match cat {
        ToolCategory::Functions => "Functions",
        ToolCategory::Disassembly => "Disassembly",
        ToolCategory::Decompile => "Decompile",
        ToolCategory::Globals => "Globals",
        ToolCategory::Metadata => "Metadata",
        ToolCategory::Editing => "Editing",
    }
}

fn write_params(out: &mut String, tool: &ToolInfo) {
    let params = tool.handler.params();
    if params.is_empty() {
        let _ = writeln!(out, "No parameters.\n");
        return;
    }
    let _ = writeln!(out, "| Parameter | Type | Required | Description |");
    let _ = writeln!(out, "|-----------|------|----------|-------------|");
    for p in params {
        let name = if p.aliases.is_empty() {
            format!("`{}`", p.name)
        } else {
            let aliases: Vec<_> = p.aliases.iter().map(|a| format!("`{a}`")).collect();
            format!("`{}` (alias {})", p.name, aliases.join(", "))
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            name,
            p.kind.json_type(),
            if p.required { "yes" } else { "no" },
            p.description
        );
    }
    let _ = writeln!(out);
}

fn main() {
    let mut groups: HashMap<ToolCategory, Vec<&ToolInfo>> = HashMap::new();
    for tool in TOOL_REGISTRY {
        groups.entry(tool.category).or_default().push(tool);
    }

    let tool_count = TOOL_REGISTRY.len();

    let mut out = String::new();
    let _ = writeln!(out, "# Tools\n");
    let _ = writeln!(
        out,
        "> Auto-generated from `src/tool_registry.rs`. Do not edit by hand."
    );
    let _ = writeln!(
        out,
        "> Regenerate with: `cargo run --bin gen_tools_doc -- docs/TOOLS.md`.\n"
    );
    let _ = writeln!(
        out,
        "`tools/list` returns the full tool set (currently {tool_count} tools).\n"
    );

    for &cat in ToolCategory::all() {
        let Some(tools) = groups.get(&cat) else {
            continue;
        };
        let _ = writeln!(out, "## {} (`{}`)\n", category_title(cat), cat.as_str());
        let _ = writeln!(out, "{}", cat.description());
        let _ = writeln!(out, "\n| Tool | Target | Description |");
        let _ = writeln!(out, "|------|--------|-------------|");
        for tool in tools {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} |",
                tool.name,
                tool.handler.target().describe(),
                tool.short_desc
            );
        }
        let _ = writeln!(out);

        for tool in tools {
            let _ = writeln!(out, "### `{}`\n", tool.name);
            let _ = writeln!(out, "{}\n", tool.full_desc);
            write_params(&mut out, tool);
            let _ = writeln!(out, "Example: `{}`\n", tool.example);
            let _ = writeln!(out, "Keywords: {}\n", tool.keywords.join(", "));
        }
    }

    let _ = writeln!(out, "## Notes\n");
    let _ = writeln!(
        out,
        "- Names are matched exactly; several matches fail with `ambiguous`"
    );
    let _ = writeln!(
        out,
        "- Omitting `function_name` targets the function at the current cursor position"
    );
    let _ = writeln!(
        out,
        "- Addresses accept hex (`0x1000`), binary (`0b...`), octal (`0o...`) or decimal (`4096`)"
    );
    let _ = writeln!(
        out,
        "- Failures are returned as `[kind] message` with `is_error: true`"
    );

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        if let Err(err) = std::fs::write(&args[1], out) {
            eprintln!("failed to write {}: {}", args[1], err);
            std::process::exit(1);
        }
    } else {
        print!("{out}");
    }
}
