//! Prompt text for every model call in the pipeline.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the required MCQ format or the
//!    section JSON contract requires editing exactly one place, and the
//!    parser in `pipeline/parse.rs` stays in lockstep with what the model is
//!    asked to emit.
//!
//! 2. **Testability** — unit tests can inspect the built prompts directly
//!    without a live model, so format regressions are caught cheaply.
//!
//! Each artifact mode has a generation prompt and a verification prompt;
//! verification output is the only thing the parser ever consumes.

/// System instruction for the MCQ generation call.
pub const MCQ_GENERATOR_SYSTEM: &str = "You are a medical exam question generator. Your task is to create Multiple-Choice Questions (MCQs) from provided lecture material, strictly following the guidelines in the attached rules document. Focus on clinical reasoning, accuracy, and adherence to medical exam standards (e.g., USMLE).";

/// System instruction for the MCQ verification call.
pub const MCQ_VERIFIER_SYSTEM: &str = "You are a medical exam question verifier and corrector. Your task is to analyze Multiple-Choice Questions (MCQs) for any violations of the rules provided, correct them if necessary, and ensure they adhere to the specified output format (Question, Options a-e, Correct Answer letter).";

/// System instruction for the mind-map structuring call.
pub const MINDMAP_SYSTEM: &str = "You are an expert AI assistant specializing in structuring text content into hierarchical mind maps. Analyze the input text and generate a detailed JSON representation suitable for creating a mind map, focusing on logical hierarchy and key information.";

/// Generation prompt asking for exactly `num_questions` MCQs over one chunk.
///
/// The format block here defines what the lenient parser accepts: a bold
/// `**Question:**` marker, a bold stem, options `a)`–`e)` on their own lines,
/// and a bold `**Correct Answer: x**` line.
pub fn mcq_generation(rules: &str, num_questions: usize, chunk: &str) -> String {
    format!(
        r#"Based on the rules provided below (which you must follow strictly):
{rules}

**Your Task:** Generate exactly {num_questions} Multiple-Choice Questions (MCQs) from the following `#text_chunk`.

**Required Output Format (Strict):**
For EACH question, provide ALL the following components:
1.  `**Question:**` Followed by the question stem (clinical vignette or direct question), in **bold**.
2.  Five answer choices labeled `a)` to `e)`, NOT bolded, each on a new line.
3.  `**Correct Answer:**` Followed by the letter (a-e) of the correct choice, in **bold**.

**Example:**
**Question:**
**A 65-year-old male presents... Which diagnosis?**
a) Aortic stenosis
b) Mitral stenosis
c) Pulmonary embolism
d) COPD
e) VSD
**Correct Answer: b**

**Important Notes:**
*   Output ONLY the questions in the format above. NO numbering, explanations, or extra text.

**#text_chunk:**

{chunk}
"#
    )
}

/// Verification prompt over the combined raw MCQ output of all chunks.
pub fn mcq_verification(rules: &str, raw_mcqs: &str) -> String {
    format!(
        r#"Based on the rules provided below (which you must follow strictly):
{rules}

**Your Task:** Review the following MCQs. Correct any violations (formatting, content, style, etc.). Ensure output perfectly matches the required format.

**Required Output Format (Strict):**
1.  `**Question:**` Stem in **bold**.
2.  Options `a)` to `e)` NOT bolded, new lines.
3.  `**Correct Answer:**` Letter (a-e) in **bold**.

**Example:**
**Question:**
**A 65-year-old male presents...**
a) Option A
b) Option B
c) Option C
d) Option D
e) Option E
**Correct Answer: b**

**Important Notes:**
*   Output ONLY the corrected questions. NO numbering, explanations, or extra text.

**MCQs to Verify and Correct:**

{raw_mcqs}
"#
    )
}

/// Generation prompt for the structured summary (JSON mode).
///
/// The contract mirrors `pipeline/parse.rs::parse_sections`: a top-level JSON
/// array of `{{title, type, content}}` objects with `type` one of
/// `paragraph`, `list`, `table`.
pub fn summary_generation(text: &str) -> String {
    format!(
        r#"**Role:** You are an expert AI medical content specialist. Your task is to distill complex medical lecture text into a structured JSON format representing a concise summary suitable for review.

**Audience:** Medical students.

**Task:** Analyze the provided medical lecture text. Identify the most critical, high-yield information. Generate a JSON output representing this summary, organized into logical sections.

**JSON Output Structure:**
The output MUST be a single JSON list `[...]` containing section objects. Each section object MUST have the following structure:
```json
{{
  "title": "Section Title (e.g., Pathophysiology)",
  "type": "paragraph | list | table",
  "content": "..."
}}
```

**Content Formats based on "type":**
*   **If `type` is `"paragraph"`:** `content` MUST be a single string containing the summarized paragraph text. Use concise language.
*   **If `type` is `"list"`:** `content` MUST be a JSON array of strings `["item 1", "item 2", ...]`, where each string is a concise list item.
*   **If `type` is `"table"`:** `content` MUST be a JSON array of objects. Each object represents a **row** in the table and MUST contain exactly two keys:
    *   `"key_point"`: String for the first column (e.g., term, category, feature).
    *   `"details"`: String for the second column (e.g., definition, description, value).
    Use this structure for comparisons, classifications, or key feature descriptions.

**Content Rules:**
1.  **High-Yield Focus:** Prioritize core concepts, mechanisms, clinical findings, diagnosis, treatment, etc.
2.  **Conciseness:** Keep all text (titles, paragraphs, list items, table cells) brief and to the point.
3.  **Accuracy:** MUST accurately reflect the source text. Do NOT add external information.
4.  **Logical Sections:** Group related information under appropriate `title` headings.

**Input Text:**
---
{text}
---

**Final Output Instruction:**
Generate **ONLY** the JSON list `[...]` based on the requirements above. Do not include any other text, comments, or markdown formatting like ```json.
"#
    )
}

/// Verification prompt comparing a summary JSON against the source text.
pub fn summary_verification(original_text: &str, summary_json: &str) -> String {
    format!(
        r#"**Role:** You are an expert AI medical content editor specializing in verifying and refining structured JSON summaries.

**Objective:** Analyze the `JSON_SUMMARY_TO_VERIFY`. Compare it against the `ORIGINAL_TEXT` based on the `VERIFICATION_GOALS`. Ensure the JSON is accurate, concise, covers key points, contains no external info, and strictly adheres to the specified JSON structure.

**Core Summary Verification Goals:**
1.  **Accuracy:** All information in the JSON summary MUST accurately reflect facts in the `ORIGINAL_TEXT`. Correct factual errors.
2.  **Key Point Coverage:** The JSON summary SHOULD capture the most important, high-yield points from the `ORIGINAL_TEXT`. Add critical missing points concisely *if structure allows*. Remove trivial details.
3.  **Conciseness:** All strings within the JSON (`title`, `content` values) MUST be brief and avoid redundancy.
4.  **No External Information:** Ensure NO information is present in the JSON that is not derivable from the `ORIGINAL_TEXT`. Remove any external info.
5.  **JSON Structure Adherence:** The output MUST be a valid JSON list `[...]`. Each object within the list MUST contain `title` (string), `type` (string: "paragraph", "list", or "table"), and `content`. The `content` format MUST match the `type` as specified. Correct any structural errors.

---
**Input 1: ORIGINAL_TEXT** (The full source material)

{original_text}

---
**Input 2: JSON_SUMMARY_TO_VERIFY** (The JSON generated previously)
```json
{summary_json}
```

---
**Output Instruction:**
Output **ONLY** the final, verified, and potentially refined JSON list `[...]`.
*   If refinements were made, output the improved JSON list.
*   If the original `JSON_SUMMARY_TO_VERIFY` met all goals perfectly, output it exactly as provided.
*   **Do NOT** include any explanations, comments, confirmations, or conversational text. Your entire response must be the final JSON list content, starting with `[` and ending with `]`.
"#
    )
}

/// Generation prompt for the restructured ("remake") notes (JSON mode).
///
/// Unlike the summary, every section's content is the two-column
/// `key_point`/`details` table shape and the goal is fidelity, not
/// compression.
pub fn remake_generation(text: &str) -> String {
    format!(
        r#"**Role:** You are an expert AI medical content structuring specialist. Your task is to meticulously analyze medical lecture text and **reconstruct** it into a detailed, structured JSON format, preserving **high fidelity** to the original content.

**Audience:** Medical students needing comprehensive, organized notes.

**Task:** Analyze the provided medical lecture text. Break it down into logical sections. For each section, further break down the information into key concepts or subtopics and their associated details. Generate a JSON output representing this detailed reconstruction. **The goal is restructuring for clarity, NOT summarization.**

**JSON Output Structure:**
The output MUST be a single JSON list `[...]` containing section objects. Each section object MUST have the following structure:
```json
{{
  "title": "Section Title (e.g., Pathophysiology of Disease X)",
  "content": [
    {{
      "key_point": "Subtopic or Concept 1",
      "details": "Comprehensive details from the text related to Key Point 1. Include definitions, explanations, examples, mechanisms, specific data, etc. Preserve original meaning and detail."
    }},
    {{
      "key_point": "Subtopic or Concept 2",
      "details": "Comprehensive details from the text related to Key Point 2..."
    }}
  ]
}}
```
Each section MUST use the `"content"` list containing `{{"key_point": ..., "details": ...}}` objects. The `"details"` string should contain all relevant information from the original text pertaining to that `"key_point"`. Embed lists or steps within the details string if necessary.

**Content Rules:**
1.  **High Fidelity:** Capture all essential information, including details, definitions, examples, classifications, mechanisms, specific values, etc., presented in the source text. Avoid simplification or omission unless the information is truly trivial or redundant within the same context.
2.  **Structure:** Organize information logically under appropriate section titles. Within each section, group related information under distinct `key_point` entries.
3.  **Accuracy:** MUST accurately reflect the meaning and terminology of the source text.
4.  **No External Information:** Do NOT add information not present in the original text.
5.  **Conciseness (Titles only):** Section titles and `key_point` strings should be clear and reasonably concise headings, but the `"details"` string MUST be comprehensive.

**Input Text:**
---
{text}
---

**Final Output Instruction:**
Generate **ONLY** the JSON list `[...]` based on the requirements above. Do not include any other text, comments, or markdown formatting like ```json.
"#
    )
}

/// Verification prompt comparing remake JSON against the source text.
pub fn remake_verification(original_text: &str, remake_json: &str) -> String {
    format!(
        r#"**Role:** You are an expert AI medical content editor focused on verifying the **fidelity** and structure of reconstructed content.

**Objective:** Analyze the `JSON_REMAKE_TO_VERIFY`. Compare it meticulously against the `ORIGINAL_TEXT` based on the `VERIFICATION_GOALS`. Ensure the JSON is an accurate, complete, and structurally correct representation of the original material.

**Core Remake Verification Goals:**
1.  **Fidelity & Completeness:** The JSON remake MUST accurately and **comprehensively** represent *all essential information* present in the `ORIGINAL_TEXT`. Check for omissions of important details, definitions, examples, mechanisms, etc. Add missing information to the appropriate `"details"` field. Correct any factual inaccuracies.
2.  **No External Information:** Ensure NO information exists in the JSON that cannot be directly supported by the `ORIGINAL_TEXT`. Remove any external additions.
3.  **Structure Adherence:** The output MUST be a valid JSON list `[...]`. Each object in the list MUST have `"title"` (string) and `"content"` (list). The `"content"` list MUST contain only objects with `"key_point"` (string) and `"details"` (string). Correct any structural deviations *strictly* according to this format.
4.  **Logical Grouping:** Ensure `key_point` entries logically group related `details` within each section `title`. Minor reorganization for better logical flow is acceptable if fidelity is maintained.
5.  **Conciseness (Titles):** `title` and `key_point` should be clear headings, but `"details"` must remain comprehensive.

---
**Input 1: ORIGINAL_TEXT** (The full source material)

{original_text}

---
**Input 2: JSON_REMAKE_TO_VERIFY** (The JSON generated previously)
```json
{remake_json}
```

---
**Output Instruction:**
Output **ONLY** the final, verified, and potentially refined JSON list `[...]`.
*   If refinements were made, output the improved JSON list.
*   If the original `JSON_REMAKE_TO_VERIFY` met all goals perfectly, output it exactly as provided.
*   **Do NOT** include any explanations, comments, confirmations, or conversational text. Your entire response must be the final JSON list content, starting with `[` and ending with `]`.
"#
    )
}

/// Prompt asking for a hierarchical mind-map topic tree (JSON mode).
///
/// Nodes are `{{title, children, hint?}}`; `"hint": "comparison_table"` on a
/// node requests the XMind tree-table structure for it.
pub fn mindmap_generation(text: &str) -> String {
    format!(
        r#"Analyze the following medical text and generate a **detailed** and hierarchical mind map structure as a JSON object. Capture important nuances and supporting information.

**Rules for Content and Hierarchy:**
1.  **Central Topic:** Root object represents the overarching theme.
2.  **Main Branches:** Identify all relevant major sections/concepts.
3.  **Sub-Branches & Depth:** Include supporting details, examples, classifications, mechanisms, data points, etc., aiming for 2-4 levels of depth where text provides detail.
4.  **Completeness:** Represent core info and supporting details comprehensively.
5.  **Conciseness:** Use concise but specific phrases for titles (3-10 words).
6.  **Logical Flow:** Structure children logically.

**Rules for Output Format:**
1.  Each JSON object (node) MUST have:
    *   `"title"`: The concise string.
    *   `"children"`: An array of child JSON objects (`[]` if none).
    *   **(Optional Hint):** If a node represents a clear comparison or distinct classification (like comparing Type 1 vs Type 2, or different drug classes side-by-side), add a field `"hint": "comparison_table"` to that node's JSON object. Do **not** add hints for simple lists or standard subtopics.
2.  Output **ONLY** the JSON object (`{{...}}`). No extra text or markdown.

**Example with Hint:**
```json
{{
  "title": "Autoimmune Hepatitis (AIH)",
  "children": [
    {{ "title": "Triad", "children": [] }},
    {{
      "title": "Types of AIH",
      "hint": "comparison_table",
      "children": [
        {{
          "title": "Type 1",
          "children": [
            {{"title": "Antibodies: ANA & ASMA", "children": []}},
            {{"title": "Severity: Mild-Moderate", "children": []}}
          ]
        }},
        {{
          "title": "Type 2",
          "children": [
            {{"title": "Antibodies: LKM-1 & LC-1", "children": []}},
            {{"title": "Severity: Often Severe", "children": []}}
          ]
        }}
      ]
    }}
  ]
}}
```

**Input Text:**
---
{text}
---

**Generate the detailed JSON structure with hints:**
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcq_generation_embeds_count_and_chunk() {
        let p = mcq_generation("No negatively-phrased stems.", 7, "The heart has four chambers.");
        assert!(p.contains("exactly 7 Multiple-Choice Questions"));
        assert!(p.contains("The heart has four chambers."));
        assert!(p.contains("No negatively-phrased stems."));
        assert!(p.contains("**Correct Answer:**"));
    }

    #[test]
    fn mcq_verification_embeds_raw_text() {
        let p = mcq_verification("rules here", "**Question:**\n**stem**");
        assert!(p.contains("**Question:**\n**stem**"));
        assert!(p.contains("rules here"));
    }

    #[test]
    fn summary_prompts_name_the_three_types() {
        let gen = summary_generation("text");
        for ty in ["paragraph", "list", "table"] {
            assert!(gen.contains(ty), "generation prompt missing type {ty}");
        }
        let ver = summary_verification("orig", "[]");
        assert!(ver.contains("ORIGINAL_TEXT"));
        assert!(ver.contains("[]"));
    }

    #[test]
    fn remake_prompt_demands_key_point_details_shape() {
        let p = remake_generation("text");
        assert!(p.contains("key_point"));
        assert!(p.contains("details"));
        assert!(p.contains("NOT summarization"));
    }

    #[test]
    fn mindmap_prompt_mentions_hint_convention() {
        let p = mindmap_generation("text");
        assert!(p.contains("comparison_table"));
        assert!(p.contains("\"children\""));
    }
}
