//! Expansion of collapsed navigation widgets.
//!
//! Documentation sidebars often hide nested sections behind toggles. Each
//! pass runs one generated script in the page that opens every widget
//! matching the configured rules; passes repeat until one opens nothing.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use docsweep_crawler::Renderer;
use docsweep_shared::{DocsweepError, ExpansionRule, Result, SessionId};

/// Totals from one expansion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Elements acted on across all passes. An upper bound on widgets opened.
    pub expanded: u64,
    /// Script executions, including the final empty one.
    pub passes: u32,
}

/// Generate the JavaScript for a single expansion pass.
///
/// The script is a function body: it applies every action of every rule to
/// each currently matching element and returns how many elements it touched.
/// Invalid selectors and throwing elements are skipped in the page.
pub fn build_expand_script(rules: &[ExpansionRule]) -> Result<String> {
    let rules_json = serde_json::to_string(rules)
        .map_err(|e| DocsweepError::Serialization(format!("expansion rules: {e}")))?;

    Ok(format!(
        r#"const rules = {rules_json};
let attempted = 0;
for (const rule of rules) {{
  let elements;
  try {{
    elements = document.querySelectorAll(rule.selector);
  }} catch (e) {{
    continue;
  }}
  for (const el of elements) {{
    try {{
      for (const action of rule.actions) {{
        switch (action.type) {{
          case "click": el.click(); break;
          case "set_attribute": el.setAttribute(action.name, action.value); break;
          case "add_class": el.classList.add(...action.classes); break;
          case "remove_class": el.classList.remove(...action.classes); break;
        }}
      }}
      attempted++;
    }} catch (e) {{
      continue;
    }}
  }}
}}
return attempted;"#
    ))
}

/// Repeatedly expand menus in the session's page until a pass finds nothing.
///
/// `settle` is slept between passes so transitions and lazy children can
/// appear. Stops with a warning after `max_passes`.
#[instrument(skip(renderer, rules), fields(%session, rules = rules.len()))]
pub async fn expand_menus(
    renderer: &dyn Renderer,
    session: &SessionId,
    rules: &[ExpansionRule],
    settle: Duration,
    max_passes: u32,
) -> Result<ExpansionReport> {
    let script = build_expand_script(rules)?;
    let mut report = ExpansionReport::default();

    while report.passes < max_passes {
        if report.passes > 0 {
            tokio::time::sleep(settle).await;
        }

        let value = renderer.execute_in_page(session, &script).await?;
        let attempted = pass_count(&value)?;
        report.passes += 1;
        debug!(pass = report.passes, attempted, "expansion pass");

        if attempted == 0 {
            return Ok(report);
        }
        report.expanded += attempted;
    }

    warn!(
        max_passes,
        expanded = report.expanded,
        "menu expansion hit the pass limit"
    );
    Ok(report)
}

fn pass_count(value: &Value) -> Result<u64> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    // Some drivers report every JS number as a float.
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        _ => Err(DocsweepError::extraction(format!(
            "expansion pass returned {value}, expected a non-negative integer"
        ))),
    }
}
