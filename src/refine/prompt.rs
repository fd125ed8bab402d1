/// Placeholder in the user template that receives the table content.
pub const TABLE_PLACEHOLDER: &str = "{table_content}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a table extraction assistant.";

pub const DEFAULT_TEMPLATE: &str = r#"<task>
Decide whether the table below breaks down the company's revenue, and if it does, transcribe it.
</task>

<revenue-table-scope>
1. revenue by product, service or business segment
2. revenue by geography
3. both of the above in one table
</revenue-table-scope>

<table>
{table_content}
</table>

<response-format>
If the table is not a revenue breakdown, answer only with: no table

Otherwise answer with one JSON object wrapped in <![CDATA[ and ]]>:
<![CDATA[
{
  "table_title": "short descriptive title",
  "items": [
    {"title": "row label", "amount": 0.0, "is_subtotal": false}
  ],
  "table_total": 0.0
}
]]>
</response-format>

<rules>
- Amounts are in millions of USD for the most recent period. Convert thousands or billions.
- Negative amounts stay negative.
- Keep the rows in the order they appear.
- Mark subtotal and total rows with "is_subtotal": true.
- Indented rows (shown with a leading "- ") are components of the row above them.
</rules>
"#;

/// System prompt plus a user template containing `{table_content}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionInstruction {
    pub system: String,
    pub template: String,
}

impl Default for ExtractionInstruction {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPLATE)
    }
}

impl ExtractionInstruction {
    pub fn new(system: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            template: template.into(),
        }
    }

    /// Loads a user template from disk, keeping the default system prompt.
    pub fn from_template_file(path: &std::path::Path) -> std::io::Result<Self> {
        let template = std::fs::read_to_string(path)?;
        if !template.contains(TABLE_PLACEHOLDER) {
            log::warn!(
                "Template {} has no {} placeholder, the table will not be sent",
                path.display(),
                TABLE_PLACEHOLDER
            );
        }
        Ok(Self::new(DEFAULT_SYSTEM_PROMPT, template))
    }

    pub fn render(&self, table_content: &str) -> String {
        self.template.replace(TABLE_PLACEHOLDER, table_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_substitutes_table() {
        let instruction = ExtractionInstruction::new("sys", "Table:\n{table_content}\nEnd");
        assert_eq!(instruction.render("<table></table>"), "Table:\n<table></table>\nEnd");
    }

    #[test]
    fn test_default_template_mentions_contract() {
        let instruction = ExtractionInstruction::default();
        assert!(instruction.template.contains(TABLE_PLACEHOLDER));
        assert!(instruction.template.contains("no table"));
        assert!(instruction.template.contains("<![CDATA["));
        assert!(!instruction.render("X").contains(TABLE_PLACEHOLDER));
    }

    #[test]
    fn test_from_template_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Extract: {{table_content}}").unwrap();
        let instruction = ExtractionInstruction::from_template_file(file.path()).unwrap();
        assert_eq!(instruction.system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(instruction.render("T"), "Extract: T");
    }
}
