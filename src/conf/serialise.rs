use std::io;
use std::path::Path;

use crate::conf::types::*;
use crate::error::Error;
use crate::writer::{self, Block, FormatOptions};

impl BindConf {
    /// Render the configuration with the default layout.
    pub fn render(&self) -> String {
        self.render_with(&FormatOptions::default())
    }

    /// Render the configuration: global elements in insertion order,
    /// then each view.
    pub fn render_with(&self, options: &FormatOptions) -> String {
        let mut out = writer::render_blocks(self.elements(), options);
        out.push_str(&writer::render_blocks(self.views(), options));
        writer::finish(out, options)
    }

    /// # Errors
    ///
    /// If the file cannot be written.  Nothing is left at `path` in
    /// that case.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        self.write_file_with(path, &FormatOptions::default())
    }

    /// # Errors
    ///
    /// If the file cannot be written.
    pub fn write_file_with<P: AsRef<Path>>(
        &self,
        path: P,
        options: &FormatOptions,
    ) -> Result<(), Error> {
        tracing::debug!(views = self.views().len(), "writing configuration");
        writer::write_file(path, &self.render_with(options))
    }

    /// # Errors
    ///
    /// If the stream cannot be written.
    pub fn write_to<W: io::Write + ?Sized>(&self, stream: &mut W) -> io::Result<()> {
        self.write_to_with(stream, &FormatOptions::default())
    }

    /// # Errors
    ///
    /// If the stream cannot be written.
    pub fn write_to_with<W: io::Write + ?Sized>(
        &self,
        stream: &mut W,
        options: &FormatOptions,
    ) -> io::Result<()> {
        writer::write_to(stream, &self.render_with(options))
    }
}

impl Block for Statement {
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions) {
        open_element(out, depth, options, self.comment.as_deref(), &self.label, &self.values);

        match &self.stanza {
            Some(items) if items.is_empty() => out.push_str(" { };\n"),
            Some(items) => {
                out.push_str(" {\n");
                for item in items {
                    options.indent.write(out, depth + 1);
                    out.push_str(item);
                    out.push_str(";\n");
                }
                close_block(out, depth, options);
            }
            None => out.push_str(";\n"),
        }
    }
}

impl Block for Clause {
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions) {
        open_element(out, depth, options, self.comment.as_deref(), &self.label, &self.args);
        out.push_str(" {\n");
        for element in &self.elements {
            element.render_block(out, depth + 1, options);
        }
        close_block(out, depth, options);
    }
}

impl Block for Element {
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions) {
        match self {
            Element::Statement(statement) => statement.render_block(out, depth, options),
            Element::Clause(clause) => clause.render_block(out, depth, options),
        }
    }
}

impl Block for ZoneConf {
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions) {
        let args = [quote(&self.name), self.class.clone()];
        open_element(out, depth, options, self.comment.as_deref(), "zone", &args);
        out.push_str(" {\n");

        Statement::new("type")
            .value(self.zone_type.to_string())
            .render_block(out, depth + 1, options);
        if let Some(file) = &self.file {
            Statement::new("file")
                .value(quote(file))
                .render_block(out, depth + 1, options);
        }
        for statement in &self.statements {
            statement.render_block(out, depth + 1, options);
        }

        close_block(out, depth, options);
    }
}

impl Block for View {
    fn render_block(&self, out: &mut String, depth: usize, options: &FormatOptions) {
        let args = [quote(&self.name), self.class.clone()];
        open_element(out, depth, options, self.comment.as_deref(), "view", &args);
        out.push_str(" {\n");

        for statement in &self.statements {
            statement.render_block(out, depth + 1, options);
        }
        for zone in &self.zones {
            zone.render_block(out, depth + 1, options);
        }

        close_block(out, depth, options);
    }
}

/// Write the comment, indentation, label, and arguments of an element.
fn open_element(
    out: &mut String,
    depth: usize,
    options: &FormatOptions,
    comment: Option<&str>,
    label: &str,
    args: &[String],
) {
    if let Some(comment) = comment {
        for line in comment.lines() {
            options.indent.write(out, depth);
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }

    options.indent.write(out, depth);
    out.push_str(label);
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
}

fn close_block(out: &mut String, depth: usize, options: &FormatOptions) {
    options.indent.write(out, depth);
    out.push_str("};\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Indent;

    #[test]
    fn render_statement_forms() {
        let options = FormatOptions::default();

        let mut out = String::new();
        Statement::new("notify-source")
            .value("3.3.3.3")
            .render_block(&mut out, 0, &options);
        assert_eq!("notify-source 3.3.3.3;\n", out);

        let mut out = String::new();
        Statement::new("allow-update")
            .stanza(["none"])
            .render_block(&mut out, 1, &options);
        assert_eq!("    allow-update {\n        none;\n    };\n", out);

        let mut out = String::new();
        Statement::new("match-clients")
            .stanza(Vec::<String>::new())
            .render_block(&mut out, 0, &options);
        assert_eq!("match-clients { };\n", out);
    }

    #[test]
    fn render_full_configuration() {
        let mut conf = BindConf::new();
        conf.add_acl(Acl::new("example_acl", ["1.1.1.1", "2.2.2.2"]));
        conf.set_options(
            Clause::options().element(Statement::new("directory").value(quote("/var/named"))),
        );

        let mut view = View::new("example_view").unwrap();
        view.set_comment("view comment");
        view.set_match_destinations(["1.1.1.1", "2.2.2.2"]);
        view.set_notify_source("3.3.3.3", None).unwrap();

        let mut zone =
            ZoneConf::new("example.com", ZoneType::Master, Some("example.com.hosts")).unwrap();
        zone.set_comment("This is a comment");
        zone.set_allow_update(["none"]);
        view.add_zone(zone).unwrap();
        conf.add_view(view).unwrap();

        assert_eq!(
            "acl \"example_acl\" {\n\
             \x20   1.1.1.1;\n\
             \x20   2.2.2.2;\n\
             };\n\
             options {\n\
             \x20   directory \"/var/named\";\n\
             };\n\
             # view comment\n\
             view \"example_view\" IN {\n\
             \x20   match-destinations {\n\
             \x20       1.1.1.1;\n\
             \x20       2.2.2.2;\n\
             \x20   };\n\
             \x20   notify-source 3.3.3.3;\n\
             \x20   # This is a comment\n\
             \x20   zone \"example.com\" IN {\n\
             \x20       type master;\n\
             \x20       file \"example.com.hosts\";\n\
             \x20       allow-update {\n\
             \x20           none;\n\
             \x20       };\n\
             \x20   };\n\
             };\n",
            conf.render()
        );
    }

    #[test]
    fn render_with_tabs() {
        let mut conf = BindConf::new();
        let mut view = View::new("v").unwrap();
        view.add_zone(ZoneConf::new(".", ZoneType::Hint, Some("root.hints")).unwrap())
            .unwrap();
        conf.add_view(view).unwrap();

        let options = FormatOptions {
            indent: Indent::Tabs,
            ..FormatOptions::default()
        };
        assert_eq!(
            "view \"v\" IN {\n\tzone \".\" IN {\n\t\ttype hint;\n\t\tfile \"root.hints\";\n\t};\n};\n",
            conf.render_with(&options)
        );
    }

    #[test]
    fn render_nested_clause() {
        let logging = Clause::logging().element(
            Clause::new("channel")
                .arg("default_log")
                .element(Statement::new("file").value(quote("/var/log/named.log")))
                .element(Statement::new("severity").value("info")),
        );

        let mut out = String::new();
        logging.render_block(&mut out, 0, &FormatOptions::default());
        assert_eq!(
            "logging {\n    channel default_log {\n        file \"/var/log/named.log\";\n        severity info;\n    };\n};\n",
            out
        );
    }

    #[test]
    fn render_empty_configuration() {
        assert_eq!("", BindConf::new().render());

        let mut buf = Vec::new();
        BindConf::new().write_to(&mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn write_to_with_uses_options() {
        let mut conf = BindConf::new();
        conf.add_acl(Acl::new("trusted", ["10.0.0.0/8"]));

        let options = FormatOptions {
            indent: Indent::Tabs,
            trailing_newline: false,
            ..FormatOptions::default()
        };
        let mut buf = Vec::new();
        conf.write_to_with(&mut buf, &options).unwrap();
        assert_eq!(
            "acl \"trusted\" {\n\t10.0.0.0/8;\n};",
            String::from_utf8(buf).unwrap()
        );
    }
}
