//! Scoring prompt assembly.
//!
//! The template interpolates a title and a (bounded) content body into the
//! rubric description and asks for JSON only. Content is always truncated to
//! an explicit character budget before interpolation so requests stay within
//! provider token ceilings; the caller learns about truncation through the
//! `truncated` flag.

/// Default character budget for interpolated content.
pub const DEFAULT_CONTENT_BUDGET: usize = 4000;

const SCORER_PROMPT: &str = r#"You are scoring content against the StepTen methodology. Be critical but constructive.

## CONTENT TO ANALYZE

Title: {{TITLE}}

Content:
{{CONTENT}}

## SCORING CRITERIA (0-100 each)

### 1. TITLE POWER (10% weight)
- Has number (not year): +20
- Has power word (brutal, secret, shocking): +25
- Creates curiosity: +25
- 50-60 chars: +15
- Keyword near start: +15

### 2. HUMAN VOICE (25% weight)
- Personal story: +25
- Hot take/opinion: +25
- Real example: +20
- Unique thoughts: +15
- Conversational: +15

### 3. CONTENT QUALITY (20% weight)
- Topic fully covered: +25
- Unique insights: +25
- Proper H1→H2→H3: +15
- Headings every 150-300 words: +15
- Short paragraphs: +10
- Bullet lists: +10

### 4. VISUAL ENGAGEMENT (15% weight)
- Hero video: +30
- Custom image: +25
- Infographic: +20
- Alt text: +15
- Visual hierarchy: +10

### 5. TECHNICAL SEO (15% weight)
- Title tag optimized: +20
- Meta description: +20
- Short URL slug: +15
- Schema markup: +25
- No broken links: +10
- Publish date: +10

### 6. INTERNAL ECOSYSTEM (10% weight)
- 2-3 internal links: +35
- 1-2 external links: +25
- Part of silo: +20
- Breadcrumbs: +10
- Related ideas: +10

### 7. AI VISIBILITY (5% weight)
- Answer-first format: +40
- FAQ section: +30
- Self-contained sections: +20
- Clear entities: +10

## OUTPUT (JSON only)

{
  "scores": {
    "titlePower": {"score": 85, "feedback": "Strong but 68 chars"},
    "humanVoice": {"score": 90, "feedback": "Great personal story"},
    "contentQuality": {"score": 80, "feedback": "Well structured"},
    "visualEngagement": {"score": 60, "feedback": "Missing hero video"},
    "technicalSeo": {"score": 75, "feedback": "Good meta, no schema"},
    "internalEcosystem": {"score": 50, "feedback": "Needs more links"},
    "aiVisibility": {"score": 70, "feedback": "Good but no FAQ"}
  },
  "weightedScore": 76.5,
  "rating": "GOOD",
  "topStrengths": ["Personal voice", "Unique insights"],
  "topWeaknesses": ["Missing video", "Few internal links"],
  "improvements": [
    {"priority": 1, "action": "Add hero video", "impact": "High"},
    {"priority": 2, "action": "Add 2 internal links", "impact": "Medium"}
  ]
}

Return ONLY valid JSON."#;

/// A fully assembled scoring prompt.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub text: String,
    /// True when the content body was cut to fit the budget
    pub truncated: bool,
}

/// Assembles scoring prompts with a bounded content budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    content_budget: usize,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            content_budget: DEFAULT_CONTENT_BUDGET,
        }
    }

    pub fn with_content_budget(mut self, budget: usize) -> Self {
        self.content_budget = budget;
        self
    }

    pub fn content_budget(&self) -> usize {
        self.content_budget
    }

    /// Build the prompt. Pure function of its inputs.
    pub fn build(&self, title: &str, content: &str) -> BuiltPrompt {
        let (body, truncated) = truncate_chars(content, self.content_budget);
        let body = if truncated {
            format!("{}...[truncated]", body)
        } else {
            body.to_string()
        };

        let text = SCORER_PROMPT
            .replacen("{{TITLE}}", title, 1)
            .replacen("{{CONTENT}}", &body, 1);

        BuiltPrompt { text, truncated }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut a string to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> (&str, bool) {
    match s.char_indices().nth(max) {
        Some((idx, _)) => (&s[..idx], true),
        None => (s, false),
    }
}
