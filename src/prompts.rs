//! Prompt templates for the chunk and synthesis stages.

/// Render the prompt used to summarize a single resume chunk.
pub fn build_chunk_prompt(chunk_text: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert technical recruiter and career coach. Given the following resume section, write a concise, information-dense summary capturing: (1) core skills and technologies, (2) most significant achievements with impact/metrics, (3) leadership, ownership, or cross-functional experience, and (4) education, certifications, or awards.\n\n",
    );
    prompt.push_str(&format!("Resume section:\n---\n{chunk_text}\n---\n\n"));
    prompt.push_str("Return a short bullet list (3-6 bullets).");
    prompt
}

/// Render the prompt that merges chunk summaries into the final narrative.
///
/// Blank summaries are skipped; the remaining ones keep their original order. An empty bullet
/// list is still rendered when nothing survives.
pub fn build_synthesis_prompt(chunk_summaries: &[String]) -> String {
    let bullet_points = chunk_summaries
        .iter()
        .map(|summary| summary.trim())
        .filter(|summary| !summary.is_empty())
        .map(|summary| format!("- {summary}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert resume analyst. You are given multiple partial summaries extracted from a resume. Synthesize them into a single comprehensive, non-redundant professional summary suitable for a recruiter.\n\n",
    );
    prompt.push_str(&format!("Partial summaries:\n{bullet_points}\n\n"));
    prompt.push_str("Requirements:\n");
    prompt.push_str("- Integrate information, remove duplicates, and ensure coherence.\n");
    prompt.push_str("- Emphasize measurable impact, scale, complexity, and leadership.\n");
    prompt.push_str("- Highlight top skills, domains, and tools accurately.\n");
    prompt.push_str(
        "- Produce 1-2 short paragraphs followed by a crisp 5-8 bullet skill snapshot.\n",
    );
    prompt.push_str("- Avoid hallucinations. Only use provided content.\n\n");
    prompt.push_str("Output format:\n");
    prompt.push_str("Paragraphs first, then a 'Key skills' bullet list.");
    prompt
}

/// Drop the prompt echo some backends prepend to their output and trim the remainder.
pub fn strip_prompt_echo<'a>(prompt: &str, generated: &'a str) -> &'a str {
    generated
        .strip_prefix(prompt)
        .unwrap_or(generated)
        .trim()
}
