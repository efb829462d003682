use std::net::IpAddr;

use crate::error::Error;
use crate::zones::reverse::parse_address;
use crate::zones::types::{validate_name, Zone};

/// Quote a name for use as a configuration argument.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A statement: a label, some arguments on the same line, and an
/// optional braced list with one item per line.
///
/// `notify-source 10.0.0.1 port 53;` or `allow-update { none; };`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub(crate) label: String,
    pub(crate) values: Vec<String>,
    pub(crate) stanza: Option<Vec<String>>,
    pub(crate) comment: Option<String>,
}

impl Statement {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            values: Vec::new(),
            stanza: None,
            comment: None,
        }
    }

    /// Add an argument after the label.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Give the statement a braced list.  An empty list is written as
    /// `{ };`.
    pub fn stanza<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stanza = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Append an item to the braced list, creating it if needed.
    pub fn push_item(&mut self, item: impl Into<String>) {
        self.stanza.get_or_insert_with(Vec::new).push(item.into());
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn items(&self) -> Option<&[String]> {
        self.stanza.as_deref()
    }
}

/// A clause: a label, some arguments, and a braced block of nested
/// elements.  `options { ... };` and `logging { ... };` are clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub(crate) label: String,
    pub(crate) args: Vec<String>,
    pub(crate) elements: Vec<Element>,
    pub(crate) comment: Option<String>,
}

impl Clause {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            args: Vec::new(),
            elements: Vec::new(),
            comment: None,
        }
    }

    /// The global `options` clause.
    pub fn options() -> Self {
        Self::new("options")
    }

    /// The global `logging` clause.
    pub fn logging() -> Self {
        Self::new("logging")
    }

    /// Add an argument between the label and the opening brace.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Builder form of `add_element`.
    pub fn element(mut self, element: impl Into<Element>) -> Self {
        self.add_element(element);
        self
    }

    pub fn add_element(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    /// Replace all elements with the same label as this one, keeping
    /// the position of the first.
    pub fn set_element(&mut self, element: impl Into<Element>) {
        replace_by_label(&mut self.elements, element.into(), Element::label);
    }

    /// All elements with a label.
    pub fn get_elements(&self, label: &str) -> Vec<&Element> {
        self.elements.iter().filter(|e| e.label() == label).collect()
    }

    /// Remove all elements with a label.
    pub fn remove_elements(&mut self, label: &str) {
        self.elements.retain(|e| e.label() != label);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

/// Anything which can appear inside a block, or at the top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Statement(Statement),
    Clause(Clause),
}

impl Element {
    pub fn label(&self) -> &str {
        match self {
            Element::Statement(s) => &s.label,
            Element::Clause(c) => &c.label,
        }
    }
}

impl From<Statement> for Element {
    fn from(statement: Statement) -> Self {
        Element::Statement(statement)
    }
}

impl From<Clause> for Element {
    fn from(clause: Clause) -> Self {
        Element::Clause(clause)
    }
}

/// A named address match list: `acl "name" { 10.0.0.0/8; };`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub name: String,
    pub addresses: Vec<String>,
    pub comment: Option<String>,
}

impl Acl {
    pub fn new<I, S>(name: &str, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            addresses: addresses.into_iter().map(Into::into).collect(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

impl From<Acl> for Statement {
    fn from(acl: Acl) -> Self {
        Statement {
            label: "acl".to_string(),
            values: vec![quote(&acl.name)],
            stanza: Some(acl.addresses),
            comment: acl.comment,
        }
    }
}

impl From<Acl> for Element {
    fn from(acl: Acl) -> Self {
        Element::Statement(acl.into())
    }
}

/// The `type` of a configured zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ZoneType {
    Master,
    Slave,
    Forward,
    Hint,
    Stub,
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ZoneType::Master => "master",
            ZoneType::Slave => "slave",
            ZoneType::Forward => "forward",
            ZoneType::Hint => "hint",
            ZoneType::Stub => "stub",
        };
        write!(f, "{s}")
    }
}

/// The `notify` behaviour of a zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Notify {
    Yes,
    No,
    Explicit,
    MasterOnly,
}

impl std::fmt::Display for Notify {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Notify::Yes => "yes",
            Notify::No => "no",
            Notify::Explicit => "explicit",
            Notify::MasterOnly => "master-only",
        };
        write!(f, "{s}")
    }
}

/// A `zone` clause in the server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConf {
    pub(crate) name: String,
    pub(crate) class: String,
    pub(crate) zone_type: ZoneType,
    pub(crate) file: Option<String>,
    pub(crate) statements: Vec<Statement>,
    pub(crate) comment: Option<String>,
}

impl ZoneConf {
    /// # Errors
    ///
    /// If the name is empty or contains whitespace or control
    /// characters.
    pub fn new(name: &str, zone_type: ZoneType, file: Option<&str>) -> Result<Self, Error> {
        let name = validate_name("zone name", name)?;
        Ok(Self::named(name, zone_type, file))
    }

    fn named(name: String, zone_type: ZoneType, file: Option<&str>) -> Self {
        Self {
            name,
            class: "IN".to_string(),
            zone_type,
            file: file.map(str::to_string),
            statements: Vec::new(),
            comment: None,
        }
    }

    /// Configuration for a zone built with `Zone`, served from `file`.
    ///
    /// The `Zone` is only read, so it can still be written out
    /// separately.
    pub fn for_zone(zone: &Zone, zone_type: ZoneType, file: &str) -> Self {
        let name = match zone.origin().trim_end_matches('.') {
            "" => ".",
            name => name,
        };
        let mut conf = Self::named(name.to_string(), zone_type, Some(file));
        if zone.kind().is_reverse() {
            conf.comment = Some(format!("reverse zone {}", zone.origin()));
        }
        conf
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn set_class(&mut self, class: &str) {
        self.class = class.to_string();
    }

    pub fn set_type(&mut self, zone_type: ZoneType) {
        self.zone_type = zone_type;
    }

    pub fn set_file(&mut self, file: &str) {
        self.file = Some(file.to_string());
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.comment = Some(comment.to_string());
    }

    pub fn set_allow_update<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_statement(Statement::new("allow-update").stanza(addresses));
    }

    pub fn set_allow_transfer<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_statement(Statement::new("allow-transfer").stanza(addresses));
    }

    pub fn set_notify(&mut self, notify: Notify) {
        self.set_statement(Statement::new("notify").value(notify.to_string()));
    }

    /// Add a primary server to the `masters` list.
    ///
    /// # Errors
    ///
    /// If the address is malformed.
    pub fn add_master(&mut self, ip: &str, port: Option<u16>, key: Option<&str>) -> Result<(), Error> {
        let mut item = parse_address(ip)?.to_string();
        if let Some(port) = port {
            item.push_str(&format!(" port {port}"));
        }
        if let Some(key) = key {
            item.push_str(&format!(" key {}", quote(key)));
        }
        self.push_item("masters", item);
        Ok(())
    }

    /// Add a server to the `also-notify` list.
    ///
    /// # Errors
    ///
    /// If the address is malformed.
    pub fn add_also_notify(&mut self, ip: &str, port: Option<u16>) -> Result<(), Error> {
        let mut item = parse_address(ip)?.to_string();
        if let Some(port) = port {
            item.push_str(&format!(" port {port}"));
        }
        self.push_item("also-notify", item);
        Ok(())
    }

    /// Add any other statement, replacing one with the same label.
    pub fn set_statement(&mut self, statement: Statement) {
        replace_by_label(&mut self.statements, statement, Statement::label);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    fn push_item(&mut self, label: &str, item: String) {
        match self.statements.iter_mut().find(|s| s.label == label) {
            Some(statement) => statement.push_item(item),
            None => self.statements.push(Statement::new(label).stanza([item])),
        }
    }
}

/// A `view` clause: view-level statements and zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub(crate) name: String,
    pub(crate) class: String,
    pub(crate) statements: Vec<Statement>,
    pub(crate) zones: Vec<ZoneConf>,
    pub(crate) comment: Option<String>,
}

impl View {
    /// # Errors
    ///
    /// As `with_class`.
    pub fn new(name: &str) -> Result<Self, Error> {
        Self::with_class(name, "IN")
    }

    /// # Errors
    ///
    /// If the name or class is empty or contains whitespace or control
    /// characters.
    pub fn with_class(name: &str, class: &str) -> Result<Self, Error> {
        Ok(Self {
            name: validate_name("view name", name)?,
            class: validate_name("view class", class)?,
            statements: Vec::new(),
            zones: Vec::new(),
            comment: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zones(&self) -> &[ZoneConf] {
        &self.zones
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.comment = Some(comment.to_string());
    }

    /// Add a zone.  Zone names are compared case-insensitively,
    /// ignoring any trailing `.`.
    ///
    /// # Errors
    ///
    /// If the view already has a zone with this name.  The view is not
    /// changed.
    pub fn add_zone(&mut self, zone: ZoneConf) -> Result<(), Error> {
        let key = name_key(&zone.name);
        if self.zones.iter().any(|z| name_key(&z.name) == key) {
            return Err(Error::DuplicateZone {
                view: self.name.clone(),
                zone: zone.name,
            });
        }

        self.zones.push(zone);
        Ok(())
    }

    pub fn set_match_clients<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_statement(Statement::new("match-clients").stanza(addresses));
    }

    pub fn set_match_destinations<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_statement(Statement::new("match-destinations").stanza(addresses));
    }

    /// Set `notify-source`, or `notify-source-v6` for an IPv6 address.
    ///
    /// # Errors
    ///
    /// If the address is malformed.
    pub fn set_notify_source(&mut self, ip: &str, port: Option<u16>) -> Result<(), Error> {
        let statement = source_statement("notify-source", ip, port)?;
        self.set_statement(statement);
        Ok(())
    }

    /// Set `transfer-source`, or `transfer-source-v6` for an IPv6
    /// address.
    ///
    /// # Errors
    ///
    /// If the address is malformed.
    pub fn set_transfer_source(&mut self, ip: &str, port: Option<u16>) -> Result<(), Error> {
        let statement = source_statement("transfer-source", ip, port)?;
        self.set_statement(statement);
        Ok(())
    }

    /// Add any other statement, replacing one with the same label.
    pub fn set_statement(&mut self, statement: Statement) {
        replace_by_label(&mut self.statements, statement, Statement::label);
    }
}

/// The whole server configuration: global elements, then views.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindConf {
    pub(crate) elements: Vec<Element>,
    pub(crate) views: Vec<View>,
}

impl BindConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn add_acl(&mut self, acl: Acl) {
        self.elements.push(acl.into());
    }

    /// Set the `options` clause, replacing any existing one.
    pub fn set_options(&mut self, options: Clause) {
        replace_by_label(&mut self.elements, Element::Clause(options), Element::label);
    }

    /// Set the `logging` clause, replacing any existing one.
    pub fn set_logging(&mut self, logging: Clause) {
        replace_by_label(&mut self.elements, Element::Clause(logging), Element::label);
    }

    /// Add any other global statement or clause.
    pub fn add_element(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    /// Add a view.
    ///
    /// # Errors
    ///
    /// If there is already a view with this name.  The configuration is
    /// not changed.
    pub fn add_view(&mut self, view: View) -> Result<(), Error> {
        if self.views.iter().any(|v| v.name == view.name) {
            return Err(Error::DuplicateView { view: view.name });
        }

        self.views.push(view);
        Ok(())
    }
}

fn source_statement(label: &str, ip: &str, port: Option<u16>) -> Result<Statement, Error> {
    let address = parse_address(ip)?;
    let label = match address {
        IpAddr::V4(_) => label.to_string(),
        IpAddr::V6(_) => format!("{label}-v6"),
    };

    let mut statement = Statement::new(&label).value(address.to_string());
    if let Some(port) = port {
        statement = statement.value("port").value(port.to_string());
    }
    Ok(statement)
}

/// Put `item` in place of the first element with the same label,
/// dropping any others, or append it.
fn replace_by_label<T>(items: &mut Vec<T>, item: T, label_of: impl Fn(&T) -> &str) {
    let label = label_of(&item).to_string();
    match items.iter().position(|i| label_of(i) == label) {
        Some(first) => {
            let mut index = 0;
            items.retain(|i| {
                let keep = index <= first || label_of(i) != label;
                index += 1;
                keep
            });
            items[first] = item;
        }
        None => items.push(item),
    }
}

/// Zone names are case-insensitive and may be written with or
/// without the trailing dot.
fn name_key(name: &str) -> String {
    match name.trim_end_matches('.') {
        "" => ".".to_string(),
        name => name.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{Block, FormatOptions};

    #[test]
    fn duplicate_zone_leaves_view_unchanged() {
        let mut view = View::new("internal").unwrap();
        view.add_zone(ZoneConf::new("example.com", ZoneType::Master, Some("a")).unwrap())
            .unwrap();

        match view.add_zone(ZoneConf::new("Example.COM.", ZoneType::Slave, Some("b")).unwrap()) {
            Err(Error::DuplicateZone { view: v, zone }) => {
                assert_eq!("internal", v);
                assert_eq!("Example.COM.", zone);
            }
            other => panic!("expected duplicate zone error, got {other:?}"),
        }
        assert_eq!(1, view.zones().len());
        assert_eq!(Some("a"), view.zones()[0].file());
    }

    #[test]
    fn duplicate_view_leaves_conf_unchanged() {
        let mut conf = BindConf::new();
        conf.add_view(View::new("internal").unwrap()).unwrap();

        assert!(matches!(
            conf.add_view(View::new("internal").unwrap()),
            Err(Error::DuplicateView { .. })
        ));
        assert_eq!(1, conf.views().len());
    }

    #[test]
    fn notify_source_label_by_family() {
        let mut view = View::new("v").unwrap();
        view.set_notify_source("3.3.3.3", None).unwrap();
        view.set_notify_source("2001:db8::1", Some(53)).unwrap();
        view.set_notify_source("4.4.4.4", None).unwrap();

        let labels: Vec<&str> = view.statements().iter().map(|s| s.label()).collect();
        assert_eq!(vec!["notify-source", "notify-source-v6"], labels);
        assert_eq!(&["4.4.4.4".to_string()], view.statements()[0].values());
        assert_eq!(
            &["2001:db8::1".to_string(), "port".to_string(), "53".to_string()],
            view.statements()[1].values()
        );

        assert!(matches!(
            view.set_transfer_source("not an address", None),
            Err(Error::AddressFormat { .. })
        ));
    }

    #[test]
    fn masters_accumulate() {
        let mut zone =
            ZoneConf::new("example.com", ZoneType::Slave, Some("slaves/example.com")).unwrap();
        zone.add_master("1.2.3.4", None, None).unwrap();
        zone.add_master("1.2.3.5", Some(5353), Some("xfer")).unwrap();

        assert_eq!(1, zone.statements().len());
        assert_eq!(
            Some(&["1.2.3.4".to_string(), "1.2.3.5 port 5353 key \"xfer\"".to_string()][..]),
            zone.statements()[0].items()
        );
    }

    #[test]
    fn for_zone_uses_origin() {
        let zone = Zone::reverse("1.168.192.in-addr.arpa.").unwrap();
        let conf = ZoneConf::for_zone(&zone, ZoneType::Master, "revzone4");

        assert_eq!("1.168.192.in-addr.arpa", conf.name());
        assert_eq!(Some("revzone4"), conf.file());
        assert!(conf.comment.is_some());

        let root = Zone::forward(".").unwrap();
        assert_eq!(".", ZoneConf::for_zone(&root, ZoneType::Hint, "root.hints").name());
    }

    #[test]
    fn set_options_replaces() {
        let mut conf = BindConf::new();
        conf.add_acl(Acl::new("trusted", ["10.0.0.0/8"]));
        conf.set_options(Clause::options().element(Statement::new("recursion").value("no")));
        conf.set_options(Clause::options().element(Statement::new("recursion").value("yes")));

        assert_eq!(2, conf.elements().len());
        assert_eq!("acl", conf.elements()[0].label());
        match &conf.elements()[1] {
            Element::Clause(clause) => {
                assert_eq!(1, clause.get_elements("recursion").len());
            }
            other => panic!("expected clause, got {other:?}"),
        }
    }

    #[test]
    fn names_are_validated() {
        assert!(matches!(View::new(""), Err(Error::Validation { .. })));
        assert!(matches!(View::new("in ternal"), Err(Error::Validation { .. })));
        assert!(matches!(
            View::with_class("internal", "I\tN"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            ZoneConf::new("", ZoneType::Master, None),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            ZoneConf::new("example\ncom", ZoneType::Master, None),
            Err(Error::Validation { .. })
        ));

        assert_eq!("internal", View::new(" internal ").unwrap().name());
        assert_eq!(".", ZoneConf::new(".", ZoneType::Hint, None).unwrap().name());
    }

    #[test]
    fn set_element_replaces_all_duplicates() {
        let mut clause = Clause::options()
            .element(Statement::new("recursion").value("no"))
            .element(Statement::new("directory").value(quote("/var/named")))
            .element(Statement::new("recursion").value("yes"))
            .element(Statement::new("dnssec-validation").value("auto"));

        clause.set_element(Statement::new("recursion").value("no"));

        let labels: Vec<&str> = clause.elements().iter().map(Element::label).collect();
        assert_eq!(vec!["recursion", "directory", "dnssec-validation"], labels);
        match &clause.get_elements("recursion")[..] {
            [Element::Statement(statement)] => assert_eq!(&["no".to_string()], statement.values()),
            other => panic!("expected one recursion statement, got {other:?}"),
        }
    }

    #[test]
    fn remove_elements_by_label() {
        let mut clause = Clause::logging()
            .element(Clause::new("channel").arg("a"))
            .element(Statement::new("category").value("default"))
            .element(Clause::new("channel").arg("b"));

        clause.remove_elements("channel");
        assert_eq!(1, clause.elements().len());
        assert_eq!("category", clause.elements()[0].label());

        clause.remove_elements("absent");
        assert_eq!(1, clause.elements().len());
    }

    #[test]
    fn zone_class_and_allow_transfer_render() {
        let mut zone =
            ZoneConf::new("example.com", ZoneType::Master, Some("db.example.com")).unwrap();
        zone.set_class("CH");
        zone.set_allow_transfer(["10.0.0.2"]);
        zone.set_allow_transfer(["10.0.0.3", "key xfer"]);

        let mut out = String::new();
        zone.render_block(&mut out, 0, &FormatOptions::default());
        assert_eq!(
            "zone \"example.com\" CH {\n\
             \x20   type master;\n\
             \x20   file \"db.example.com\";\n\
             \x20   allow-transfer {\n\
             \x20       10.0.0.3;\n\
             \x20       key xfer;\n\
             \x20   };\n\
             };\n",
            out
        );
    }

    #[test]
    fn quote_escapes() {
        assert_eq!("\"a\\\"b\"", quote("a\"b"));
    }
}
