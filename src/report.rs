use crate::llm::AnalysisMode;

/// Fixed footer appended to every issue body
const FOOTER: &str = "---\nThis report was generated automatically by buildkeeper.";

/// Category of the emitted report, one per analysis mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    BuildFailure,
    TestFailure,
    Warnings,
    Review,
}

impl From<AnalysisMode> for IssueType {
    fn from(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::BuildFailure => IssueType::BuildFailure,
            AnalysisMode::TestFailure => IssueType::TestFailure,
            AnalysisMode::Warnings => IssueType::Warnings,
            AnalysisMode::Review => IssueType::Review,
        }
    }
}

/// Outcome of a pipeline phase as shown in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Passed,
    Failed,
    /// Phase never ran (tests after a failed build)
    Skipped,
}

impl PhaseStatus {
    fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Passed => "PASSED",
            PhaseStatus::Failed => "FAILED",
            PhaseStatus::Skipped => "SKIPPED",
        }
    }
}

/// Final structured report, built once after both phases have concluded
#[derive(Debug, Clone)]
pub struct Report {
    pub issue_type: IssueType,
    pub commit: String,
    pub mode: &'static str,
    pub build_status: PhaseStatus,
    pub test_status: PhaseStatus,
    pub analysis: String,
}

impl Report {
    /// Issue title, fixed template per issue type
    pub fn title(&self) -> String {
        match self.issue_type {
            IssueType::BuildFailure => format!("Build failure on {}", self.commit),
            IssueType::TestFailure => format!("Test failure on {}", self.commit),
            IssueType::Warnings => format!("Compiler warnings on {}", self.commit),
            IssueType::Review => format!("Code review for {}", self.commit),
        }
    }

    /// Multi-line issue body for the automation consumer
    pub fn body(&self) -> String {
        format!(
            "Commit: {}\nMode: {}\nBuild: {}\nTests: {}\n\n{}\n\n{}",
            self.commit,
            self.mode,
            self.build_status.as_str(),
            self.test_status.as_str(),
            self.analysis,
            FOOTER
        )
    }

    /// Human-readable console block
    pub fn render_console(&self) -> String {
        format!(
            "==============================\n\
             {}\n\
             ==============================\n\
             Build: {}  Tests: {}\n\n\
             {}\n",
            self.title(),
            self.build_status.as_str(),
            self.test_status.as_str(),
            self.analysis
        )
    }

    /// Two-key machine block: `ISSUE_TITLE=` line plus heredoc-delimited body
    pub fn render_machine(&self) -> String {
        format!("ISSUE_TITLE={}\nISSUE_BODY<<EOF\n{}\nEOF\n", self.title(), self.body())
    }

    /// Emit both blocks on stdout
    pub fn print(&self) {
        println!("{}", self.render_console());
        print!("{}", self.render_machine());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(issue_type: IssueType) -> Report {
        Report {
            issue_type,
            commit: "abc1234".into(),
            mode: "auto",
            build_status: PhaseStatus::Failed,
            test_status: PhaseStatus::Skipped,
            analysis: "The compiler says the semicolon is missing.".into(),
        }
    }

    #[test]
    fn test_title_templates() {
        assert_eq!(
            report(IssueType::BuildFailure).title(),
            "Build failure on abc1234"
        );
        assert_eq!(
            report(IssueType::TestFailure).title(),
            "Test failure on abc1234"
        );
        assert_eq!(
            report(IssueType::Warnings).title(),
            "Compiler warnings on abc1234"
        );
        assert_eq!(
            report(IssueType::Review).title(),
            "Code review for abc1234"
        );
    }

    #[test]
    fn test_body_carries_all_fields() {
        let body = report(IssueType::BuildFailure).body();
        assert!(body.contains("Commit: abc1234"));
        assert!(body.contains("Mode: auto"));
        assert!(body.contains("Build: FAILED"));
        assert!(body.contains("Tests: SKIPPED"));
        assert!(body.contains("semicolon is missing"));
        assert!(body.contains("generated automatically"));
    }

    #[test]
    fn test_machine_block_shape() {
        let machine = report(IssueType::TestFailure).render_machine();
        let mut lines = machine.lines();
        assert_eq!(lines.next(), Some("ISSUE_TITLE=Test failure on abc1234"));
        assert_eq!(lines.next(), Some("ISSUE_BODY<<EOF"));
        assert_eq!(machine.lines().last(), Some("EOF"));
    }

    #[test]
    fn test_issue_type_from_mode() {
        assert_eq!(
            IssueType::from(AnalysisMode::Review),
            IssueType::Review
        );
        assert_eq!(
            IssueType::from(AnalysisMode::Warnings),
            IssueType::Warnings
        );
    }
}
