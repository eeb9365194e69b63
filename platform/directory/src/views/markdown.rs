use pulldown_cmark::{html, Event, Options, Parser};

/// Renders update markdown to HTML. Raw HTML in the source is escaped and
/// single newlines become line breaks.
pub fn render_markdown(source: &str) -> String {
	let mut options = Options::empty();
	options.insert(Options::ENABLE_STRIKETHROUGH);
	options.insert(Options::ENABLE_TABLES);
	options.insert(Options::ENABLE_TASKLISTS);

	let events = Parser::new_ext(source, options).map(|event| match event {
		Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
		Event::SoftBreak => Event::HardBreak,
		other => other,
	});

	let mut out = String::with_capacity(source.len() * 3 / 2);
	html::push_html(&mut out, events);
	out
}
