//! Persona preamble sent at the start of every conversation.

use chrono::NaiveDate;

/// The assistant's identity plus the working rules it follows.
#[derive(Debug, Clone)]
pub struct PersonaPrompt {
    pub name: String,
    pub currency: String,
    pub extra_rules: Vec<String>,
}

impl Default for PersonaPrompt {
    fn default() -> Self {
        Self {
            name: "LedgerForge".into(),
            currency: "USD".into(),
            extra_rules: Vec::new(),
        }
    }
}

impl PersonaPrompt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.extra_rules.push(rule.into());
        self
    }

    /// Render the preamble for a conversation starting on `today`.
    pub fn render(&self, today: NaiveDate) -> String {
        let mut rules = vec![
            "Use the available tools to read or change business data. Never invent figures.".to_string(),
            "When a request needs a client or project, resolve its name to an ID with findClientByName or findProjectByName first.".to_string(),
            "If required information is missing (an amount, a name, a client), ask for it instead of guessing.".to_string(),
            format!("Format money with two decimals in {}.", self.currency),
            "When a tool reports an error, tell the user plainly what could not be done.".to_string(),
            "Keep answers short and concrete.".to_string(),
        ];
        rules.extend(self.extra_rules.iter().cloned());

        let numbered: String = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{}. {}\n", i + 1, rule))
            .collect();

        format!(
            "You are {}, a business assistant for a freelancer or small agency. \
             You help manage clients, projects, payments, invoices, expenses and retainers.\n\
             Today is {} ({}).\n\nRULES:\n{}",
            self.name,
            today.format("%Y-%m-%d"),
            today.format("%A"),
            numbered
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_date_and_rules() {
        let prompt = PersonaPrompt::new("Ledger")
            .with_currency("EUR")
            .with_rule("Answer in German.")
            .render(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert!(prompt.starts_with("You are Ledger"));
        assert!(prompt.contains("Today is 2026-03-02 (Monday)"));
        assert!(prompt.contains("two decimals in EUR"));
        assert!(prompt.contains("7. Answer in German."));
    }
}
