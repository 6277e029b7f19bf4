// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Latency checks for the synoptic tokenizer on viewport-sized batches.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::syntax::{SynopticTokenizer, Tokenizer};

    /// Maximum acceptable time for one warm viewport batch.
    const MAX_VIEWPORT_TIME: Duration = Duration::from_millis(1000);

    struct Sample {
        language_id: &'static str,
        lines: Vec<&'static str>,
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample {
                language_id: "rust",
                lines: vec![
                    "use std::collections::HashMap;",
                    "",
                    "/// Groups words by their first letter.",
                    "pub fn group(words: &[&str]) -> HashMap<char, Vec<String>> {",
                    "    let mut groups = HashMap::new();",
                    "    for word in words {",
                    "        // Skip empty input",
                    "        let Some(first) = word.chars().next() else { continue };",
                    "        groups.entry(first).or_insert_with(Vec::new).push(word.to_string());",
                    "    }",
                    "    println!(\"{} groups\", groups.len());",
                    "    groups",
                    "}",
                    "",
                    "impl<T: Display> Render for Vec<T> {",
                    "\tconst LIMIT: usize = 1024;",
                    "    fn render(&self) -> String { self.iter().map(|x| x.to_string()).collect() }",
                    "}",
                ],
            },
            Sample {
                language_id: "tsx",
                lines: vec![
                    "import { useEffect, useState } from 'react';",
                    "",
                    "/**",
                    " * Polls a status endpoint.",
                    " */",
                    "export function useStatus(url: string) {",
                    "    const [status, setStatus] = useState<string | null>(null);",
                    "    useEffect(() => {",
                    "        const id = setInterval(async () => {",
                    "            const res = await fetch(`${url}/status`);",
                    "            setStatus(res.ok ? 'up' : \"down\");",
                    "        }, 1000);",
                    "        return () => clearInterval(id);",
                    "    }, [url]);",
                    "    return status;",
                    "}",
                ],
            },
            Sample {
                language_id: "python",
                lines: vec![
                    "#!/usr/bin/env python3",
                    "\"\"\"Small batch processor.\"\"\"",
                    "",
                    "from dataclasses import dataclass, field",
                    "",
                    "@dataclass",
                    "class Batch:",
                    "    items: list[str] = field(default_factory=list)",
                    "",
                    "    def process(self) -> dict[str, int]:",
                    "        # Count by length",
                    "        return {item: len(item) for item in self.items if item}",
                    "",
                    "    async def flush(self):",
                    "        print(f\"flushing {len(self.items)} items\")",
                ],
            },
        ]
    }

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_viewport_performance() {
        let tokenizer = SynopticTokenizer::default();

        for sample in samples() {
            let lines = owned(&sample.lines);
            // Grammar construction happens on the first call.
            tokenizer.tokenize(&lines[..1], sample.language_id).unwrap();

            let start = Instant::now();
            let output = tokenizer.tokenize(&lines, sample.language_id).unwrap();
            let duration = start.elapsed();

            assert_eq!(output.len(), lines.len());
            assert!(
                duration < MAX_VIEWPORT_TIME,
                "viewport for {} took {:?} (max allowed: {:?})",
                sample.language_id,
                duration,
                MAX_VIEWPORT_TIME
            );
        }
    }

    #[test]
    fn test_every_sample_line_round_trips() {
        let tokenizer = SynopticTokenizer::default();

        for sample in samples() {
            let lines = owned(&sample.lines);
            let output = tokenizer.tokenize(&lines, sample.language_id).unwrap();
            for (index, (token_line, line)) in output.iter().zip(&lines).enumerate() {
                assert!(
                    token_line.round_trips(line),
                    "{} line {} did not round-trip",
                    sample.language_id,
                    index
                );
            }
        }
    }

    #[test]
    fn test_long_line_performance() {
        let tokenizer = SynopticTokenizer::default();
        let long_line = "let data = vec![".to_string()
            + &(0..1000).map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
            + "];";
        tokenizer.tokenize(&owned(&["fn warm() {}"]), "rust").unwrap();

        let start = Instant::now();
        let output = tokenizer.tokenize(&[long_line.clone()], "rust").unwrap();
        let duration = start.elapsed();

        assert!(output[0].round_trips(&long_line));
        assert!(duration < Duration::from_millis(500), "long line took {duration:?}");
    }
}
