/// The preset coach personas a user can chat with. Each persona only differs
/// in the system instruction sent alongside the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoachAgent {
    Football,
    Tennis,
    Boxing,
    Basketball,
    FormulaOne,
}

impl CoachAgent {
    pub const ALL: [CoachAgent; 5] = [
        CoachAgent::Football,
        CoachAgent::Tennis,
        CoachAgent::Boxing,
        CoachAgent::Basketball,
        CoachAgent::FormulaOne,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        match self {
            CoachAgent::Football => 0,
            CoachAgent::Tennis => 1,
            CoachAgent::Boxing => 2,
            CoachAgent::Basketball => 3,
            CoachAgent::FormulaOne => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CoachAgent::Football => "Football",
            CoachAgent::Tennis => "Tennis",
            CoachAgent::Boxing => "Boxing",
            CoachAgent::Basketball => "Basketball",
            CoachAgent::FormulaOne => "Formula 1",
        }
    }

    fn sport(self) -> &'static str {
        match self {
            CoachAgent::Football => "football",
            CoachAgent::Tennis => "tennis",
            CoachAgent::Boxing => "boxing",
            CoachAgent::Basketball => "basketball",
            CoachAgent::FormulaOne => "Formula 1",
        }
    }

    pub fn system_prompt(self) -> String {
        format!(
            "You are a world-renowned expert and passionate coach in {sport}. \
             Answer concisely, precisely and encouragingly, as if speaking to a \
             curious or beginner-level person. Give concrete advice and clear \
             explanations, and pitch your answers at an amateur level unless told \
             otherwise. Always reply in the same language as the question.",
            sport = self.sport()
        )
    }

    /// Parses a CLI-supplied persona name. Accepts the display label in any
    /// case, with spaces, dashes or nothing between words.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "football" => Some(CoachAgent::Football),
            "tennis" => Some(CoachAgent::Tennis),
            "boxing" => Some(CoachAgent::Boxing),
            "basketball" => Some(CoachAgent::Basketball),
            "formula1" | "formulaone" | "f1" => Some(CoachAgent::FormulaOne),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let idx = (self.index() + 1) % Self::COUNT;
        Self::ALL[idx]
    }

    pub fn prev(self) -> Self {
        let idx = (self.index() + Self::COUNT - 1) % Self::COUNT;
        Self::ALL[idx]
    }
}
