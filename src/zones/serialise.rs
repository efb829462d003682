use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::error::Error;
use crate::writer::{self, Columns, FormatOptions};
use crate::zones::types::*;

/// Longest character-string allowed in TXT RDATA.
const MAX_CHARACTER_STRING_LEN: usize = 255;

impl Zone {
    /// Render the zone file with the default layout.
    pub fn render(&self) -> String {
        self.render_with(&FormatOptions::default())
    }

    /// Render the zone file: `$ORIGIN` and `$TTL`, then the SOA record
    /// (if there is one), then the other records in insertion order.
    pub fn render_with(&self, options: &FormatOptions) -> String {
        let mut out = String::new();

        _ = writeln!(&mut out, "$ORIGIN {}", self.origin());
        _ = writeln!(&mut out, "$TTL {}", self.default_ttl());

        let rows = self.soa().into_iter().chain(self.records());
        out.push_str(&writer::render_lines(rows, options));

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
        tracing::debug!(origin = %self.origin(), records = self.records().len(), "writing zone");
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

impl ResourceRecord {
    /// Render as a single line, without any comment.
    pub fn render(&self) -> String {
        self.columns()
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Columns for ResourceRecord {
    fn columns(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            self.ttl().map(|ttl| ttl.to_string()).unwrap_or_default(),
            "IN".to_string(),
            self.rtype().to_string(),
            self.data().serialise(),
        ]
    }

    fn preamble(&self) -> Vec<String> {
        match self.comment() {
            Some(comment) => comment.lines().map(|line| format!("; {line}")).collect(),
            None => Vec::new(),
        }
    }
}

impl RecordData {
    /// Serialise the RDATA.  Names are written as given.
    pub fn serialise(&self) -> String {
        match self {
            RecordData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"),
            RecordData::NS { nsdname } => nsdname.clone(),
            RecordData::A { address } => format!("{address}"),
            RecordData::AAAA { address } => format!("{address}"),
            RecordData::MX {
                preference,
                exchange,
            } => format!("{preference} {exchange}"),
            RecordData::TXT { text } => serialise_text(text.as_bytes()),
            RecordData::CNAME { cname } => cname.clone(),
            RecordData::PTR { ptrdname } => ptrdname.clone(),
        }
    }
}

/// Serialise text as one or more quoted character-strings, splitting
/// every `MAX_CHARACTER_STRING_LEN` octets.
fn serialise_text(octets: &[u8]) -> String {
    octets
        .chunks(MAX_CHARACTER_STRING_LEN)
        .map(quote_octets)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serialise a string of octets to a quoted string with the
/// appropriate escaping.
fn quote_octets(octets: &[u8]) -> String {
    let mut out = String::with_capacity(2 + octets.len());

    out.push('"');
    for octet in octets {
        if *octet == b'"' || *octet == b'\\' {
            out.push('\\');
            out.push(*octet as char);
        } else if *octet < 32 || *octet > 126 {
            _ = write!(&mut out, "\\{octet:03}");
        } else {
            out.push(*octet as char);
        }
    }
    out.push('"');

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_soa() -> Soa {
        Soa {
            serial: Some(2024010100),
            ..Soa::default()
        }
    }

    #[test]
    fn quote_octets_special() {
        assert_eq!("\"\\012\"", quote_octets(&[12]));
        assert_eq!("\"\\234\"", quote_octets(&[234]));

        assert_eq!("\"\\\\\"", quote_octets(b"\\"));
        assert_eq!("\"\\\"\"", quote_octets(b"\""));
        assert_eq!("\"v=spf1 mx ~all\"", quote_octets(b"v=spf1 mx ~all"));
    }

    #[test]
    fn serialise_long_text_splits() {
        let text = "a".repeat(300);
        let serialised = serialise_text(text.as_bytes());

        assert_eq!(
            format!("\"{}\" \"{}\"", "a".repeat(255), "a".repeat(45)),
            serialised
        );
    }

    #[test]
    fn render_record_lines() {
        assert_eq!(
            "@ IN MX 20 mail2",
            ResourceRecord::mx(APEX, 20, "mail2").unwrap().render()
        );
        assert_eq!(
            "ns1 600 IN A 192.168.1.1",
            ResourceRecord::a("ns1", "192.168.1.1")
                .unwrap()
                .with_ttl(Some(600))
                .unwrap()
                .render()
        );
        assert_eq!(
            "@ IN AAAA c0ff::ee00",
            ResourceRecord::aaaa(APEX, "C0FF:0:0::EE00").unwrap().render()
        );
        assert_eq!(
            "@ IN TXT \"some text\"",
            ResourceRecord::txt(APEX, "some text").unwrap().render()
        );
        assert_eq!(
            "4.3.2.1.in-addr.arpa. IN PTR mail.bar.com.",
            ResourceRecord::ptr("1.2.3.4", "mail.bar.com.").unwrap().render()
        );
    }

    #[test]
    fn render_zone() {
        let mut zone = Zone::forward("example.com").unwrap();
        zone.add_soa("ns1", "hostmaster", fixed_soa()).unwrap();
        zone.add_ns("ns1", APEX, None).unwrap();
        zone.add_mx("mail2", 20, APEX, Some(600)).unwrap();
        zone.add_a("192.168.1.1", "ns1", None).unwrap();

        assert_eq!(
            "$ORIGIN example.com.\n\
             $TTL 3600\n\
             @       IN SOA ns1 hostmaster 2024010100 10800 3600 172800 3600\n\
             @       IN NS  ns1\n\
             @   600 IN MX  20 mail2\n\
             ns1     IN A   192.168.1.1\n",
            zone.render()
        );
    }

    #[test]
    fn render_zone_soa_first() {
        let mut zone = Zone::forward("example.com").unwrap();
        zone.add_a("192.168.1.1", "ns1", None).unwrap();
        zone.add_ns("ns1", APEX, None).unwrap();
        zone.add_soa("ns1", "hostmaster", fixed_soa()).unwrap();

        let rendered = zone.render();
        let first_record = rendered.lines().nth(2).unwrap();
        assert!(first_record.contains(" SOA "), "{rendered}");
    }

    #[test]
    fn render_zone_is_idempotent() {
        let mut zone = Zone::reverse("1.168.192.in-addr.arpa").unwrap();
        zone.add_soa("ns1.example.com.", "hostmaster@example.com.", Soa::default())
            .unwrap();
        zone.add_ns("ns1.example.com.", APEX, None).unwrap();
        zone.add_ptr("192.168.1.1", "ns1.example.com.", None).unwrap();

        assert_eq!(zone.render(), zone.render());
    }

    #[test]
    fn render_zone_fragment_without_soa() {
        let mut zone = Zone::forward("example.com").unwrap();
        zone.add_cname("mail", "mailserver", None).unwrap();

        assert_eq!(
            "$ORIGIN example.com.\n$TTL 3600\nmailserver IN CNAME mail\n",
            zone.render()
        );
    }

    #[test]
    fn render_zone_with_comments() {
        let mut zone = Zone::forward("example.com").unwrap();
        zone.add_record(
            ResourceRecord::a("host", "10.0.0.1")
                .unwrap()
                .with_comment("a multi-\nline comment"),
        );

        assert_eq!(
            "$ORIGIN example.com.\n$TTL 3600\n; a multi-\n; line comment\nhost IN A 10.0.0.1\n",
            zone.render()
        );
    }

    #[test]
    fn render_zone_unaligned_without_trailing_newline() {
        let mut zone = Zone::forward("example.com").unwrap();
        zone.add_ns("ns1", APEX, None).unwrap();
        zone.add_a("192.168.1.1", "ns1", Some(60)).unwrap();

        let options = FormatOptions {
            align_columns: false,
            trailing_newline: false,
            ..FormatOptions::default()
        };
        assert_eq!(
            "$ORIGIN example.com.\n$TTL 3600\n@ IN NS ns1\nns1 60 IN A 192.168.1.1",
            zone.render_with(&options)
        );

        let mut buf = Vec::new();
        zone.write_to_with(&mut buf, &options).unwrap();
        assert_eq!(zone.render_with(&options), String::from_utf8(buf).unwrap());
    }
}
