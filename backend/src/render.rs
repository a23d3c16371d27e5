use shared::{VoteCounts, VoteSettings};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '{' => out.push_str("&#123;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_index(settings: &VoteSettings, counts: &VoteCounts) -> String {
    let vars = [
        ("{{title}}", escape_html(&settings.title)),
        ("{{button1}}", escape_html(&settings.options.first)),
        ("{{button2}}", escape_html(&settings.options.second)),
        ("{{value1}}", counts.first.to_string()),
        ("{{value2}}", counts.second.to_string()),
    ];

    vars.iter()
        .fold(INDEX_TEMPLATE.to_string(), |page, (placeholder, value)| {
            page.replace(placeholder, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::VoteOptions;

    #[test]
    fn renders_labels_counts_and_title() {
        let settings = VoteSettings {
            options: VoteOptions::new("Cats", "Dogs"),
            title: "Azure Voting App".into(),
        };
        let page = render_index(&settings, &VoteCounts { first: 7, second: 3 });

        assert!(page.contains("<title>Azure Voting App</title>"));
        assert!(page.contains("Cats - 7 | Dogs - 3"));
        assert!(page.contains(r#"value="Cats""#));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn escapes_configured_text() {
        let settings = VoteSettings {
            options: VoteOptions::new("<b>", "\"q\""),
            title: "Tom & Jerry".into(),
        };
        let page = render_index(&settings, &VoteCounts::default());

        assert!(page.contains("Tom &amp; Jerry"));
        assert!(page.contains(r#"value="&lt;b&gt;""#));
        assert!(page.contains(r#"value="&quot;q&quot;""#));
        assert!(!page.contains("<b>"));
    }
}
