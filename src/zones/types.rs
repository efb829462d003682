use chrono::{Datelike, Local, Utc};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::Error;
use crate::zones::reverse::*;

/// Owner name used when none is given: the zone apex.
pub const APEX: &str = "@";

/// Default `$TTL` of a zone, one hour.
pub const DEFAULT_TTL: u32 = 3600;

/// Default SOA timers, from the RFC 1912 recommendations.
pub const DEFAULT_REFRESH: u32 = 10800;
pub const DEFAULT_RETRY: u32 = 3600;
pub const DEFAULT_EXPIRE: u32 = 172_800;
pub const DEFAULT_MINIMUM: u32 = 3600;

/// Default MX preference.
pub const DEFAULT_MX_PREFERENCE: u16 = 10;

/// Largest TTL allowed by RFC 2181.
pub const MAX_TTL: u32 = 2_147_483_647;

/// The record kinds which can be written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    SOA,
    NS,
    A,
    AAAA,
    MX,
    TXT,
    CNAME,
    PTR,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            RecordType::SOA => "SOA",
            RecordType::NS => "NS",
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::CNAME => "CNAME",
            RecordType::PTR => "PTR",
        };
        write!(f, "{s}")
    }
}

/// The type-specific part of a record.
///
/// Host names are written unmodified: end them with a `.` to make
/// them fully-qualified, otherwise they are relative to `$ORIGIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    SOA {
        mname: String,
        /// Responsible mailbox, in domain name form (see
        /// `mailbox_name`).
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    NS {
        nsdname: String,
    },
    A {
        address: Ipv4Addr,
    },
    AAAA {
        address: Ipv6Addr,
    },
    MX {
        preference: u16,
        exchange: String,
    },
    TXT {
        text: String,
    },
    CNAME {
        cname: String,
    },
    PTR {
        ptrdname: String,
    },
}

impl RecordData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordData::SOA { .. } => RecordType::SOA,
            RecordData::NS { .. } => RecordType::NS,
            RecordData::A { .. } => RecordType::A,
            RecordData::AAAA { .. } => RecordType::AAAA,
            RecordData::MX { .. } => RecordType::MX,
            RecordData::TXT { .. } => RecordType::TXT,
            RecordData::CNAME { .. } => RecordType::CNAME,
            RecordData::PTR { .. } => RecordType::PTR,
        }
    }

    /// Check the fields which the type system cannot, trimming the
    /// names.
    fn validated(self) -> Result<Self, Error> {
        Ok(match self {
            RecordData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => RecordData::SOA {
                mname: validate_name("primary name server", &mname)?,
                rname: validate_name("contact", &rname)?,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            },
            RecordData::NS { nsdname } => RecordData::NS {
                nsdname: validate_name("name server", &nsdname)?,
            },
            RecordData::MX {
                preference,
                exchange,
            } => RecordData::MX {
                preference,
                exchange: validate_name("exchange", &exchange)?,
            },
            RecordData::TXT { text } => {
                if text.is_empty() {
                    return Err(Error::validation("text", "must not be empty"));
                }
                RecordData::TXT { text }
            }
            RecordData::CNAME { cname } => RecordData::CNAME {
                cname: validate_name("canonical name", &cname)?,
            },
            RecordData::PTR { ptrdname } => RecordData::PTR {
                ptrdname: validate_name("pointer target", &ptrdname)?,
            },
            data @ (RecordData::A { .. } | RecordData::AAAA { .. }) => data,
        })
    }
}

/// A single resource record.  Construct with `ResourceRecord::new` or
/// one of the per-type helpers, which validate the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    name: String,
    ttl: Option<u32>,
    comment: Option<String>,
    data: RecordData,
}

impl ResourceRecord {
    /// # Errors
    ///
    /// If the owner name or any name in the data is empty or contains
    /// whitespace, or if TXT data is empty.
    pub fn new(name: &str, data: RecordData) -> Result<Self, Error> {
        Ok(Self {
            name: validate_name("owner name", name)?,
            ttl: None,
            comment: None,
            data: data.validated()?,
        })
    }

    /// Override the zone's default TTL for this record.
    ///
    /// # Errors
    ///
    /// If the TTL is above `MAX_TTL`.
    pub fn with_ttl(mut self, ttl: Option<u32>) -> Result<Self, Error> {
        self.ttl = validate_ttl(ttl)?;
        Ok(self)
    }

    /// Attach a comment, written on the line(s) above the record.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn ns(name: &str, name_server: &str) -> Result<Self, Error> {
        Self::new(
            name,
            RecordData::NS {
                nsdname: name_server.to_string(),
            },
        )
    }

    pub fn a(name: &str, address: &str) -> Result<Self, Error> {
        match parse_address(address)? {
            IpAddr::V4(address) => Self::new(name, RecordData::A { address }),
            IpAddr::V6(_) => Err(Error::address_format(address)),
        }
    }

    pub fn aaaa(name: &str, address: &str) -> Result<Self, Error> {
        match parse_address(address)? {
            IpAddr::V6(address) => Self::new(name, RecordData::AAAA { address }),
            IpAddr::V4(_) => Err(Error::address_format(address)),
        }
    }

    pub fn mx(name: &str, preference: u16, exchange: &str) -> Result<Self, Error> {
        Self::new(
            name,
            RecordData::MX {
                preference,
                exchange: exchange.to_string(),
            },
        )
    }

    pub fn txt(name: &str, text: &str) -> Result<Self, Error> {
        Self::new(
            name,
            RecordData::TXT {
                text: text.to_string(),
            },
        )
    }

    pub fn cname(name: &str, canonical_name: &str) -> Result<Self, Error> {
        Self::new(
            name,
            RecordData::CNAME {
                cname: canonical_name.to_string(),
            },
        )
    }

    /// A PTR record owned by the reverse-lookup name of `address`.
    pub fn ptr(address: &str, target: &str) -> Result<Self, Error> {
        Self::new(
            &reverse_name(address)?,
            RecordData::PTR {
                ptrdname: target.to_string(),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Option<u32> {
        self.ttl
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    pub fn rtype(&self) -> RecordType {
        self.data.rtype()
    }
}

/// Forward zones map names to data; reverse zones map addresses to
/// names.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ZoneKind {
    Forward,
    ReverseV4,
    ReverseV6,
}

impl ZoneKind {
    pub fn is_reverse(&self) -> bool {
        !matches!(self, ZoneKind::Forward)
    }
}

/// How the SOA serial is chosen when none is given.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SerialPolicy {
    /// `YYYYMMDD00`, from the local date.
    #[default]
    Date,
    /// Seconds since the Unix epoch.
    Epoch,
}

impl SerialPolicy {
    pub fn serial(&self) -> u32 {
        match self {
            SerialPolicy::Date => {
                let today = Local::now().date_naive();
                let year = u32::try_from(today.year()).unwrap_or(0);
                year * 1_000_000 + today.month() * 10_000 + today.day() * 100
            }
            SerialPolicy::Epoch => u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX),
        }
    }
}

/// The optional parts of a SOA record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Soa {
    /// If `None`, the zone's `SerialPolicy` picks one.
    pub serial: Option<u32>,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    /// Negative caching TTL.
    pub minimum: u32,
    pub ttl: Option<u32>,
}

impl Default for Soa {
    fn default() -> Self {
        Self {
            serial: None,
            refresh: DEFAULT_REFRESH,
            retry: DEFAULT_RETRY,
            expire: DEFAULT_EXPIRE,
            minimum: DEFAULT_MINIMUM,
            ttl: None,
        }
    }
}

/// A zone: an origin, a default TTL, at most one SOA record, and an
/// ordered list of other records.
///
/// Records are written in the order they were added, after the SOA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Always ends in a `.`.
    origin: String,
    kind: ZoneKind,
    default_ttl: u32,
    serial_policy: SerialPolicy,
    soa: Option<ResourceRecord>,
    records: Vec<ResourceRecord>,
}

impl Zone {
    /// Construct an empty zone.
    ///
    /// # Errors
    ///
    /// If the name is empty or contains whitespace, or if a reverse
    /// kind is given for a name outside the matching `arpa` tree.
    pub fn new(name: &str, kind: ZoneKind) -> Result<Self, Error> {
        let mut origin = validate_name("zone name", name)?;
        if !origin.ends_with('.') {
            origin.push('.');
        }

        let suffix_ok = match kind {
            ZoneKind::Forward => true,
            ZoneKind::ReverseV4 => is_under(&origin, IPV4_REVERSE_SUFFIX),
            ZoneKind::ReverseV6 => is_under(&origin, IPV6_REVERSE_SUFFIX),
        };
        if !suffix_ok {
            return Err(Error::validation(
                "zone name",
                &format!("'{origin}' is not a {kind:?} zone"),
            ));
        }

        Ok(Self {
            origin,
            kind,
            default_ttl: DEFAULT_TTL,
            serial_policy: SerialPolicy::default(),
            soa: None,
            records: Vec::new(),
        })
    }

    pub fn forward(name: &str) -> Result<Self, Error> {
        Self::new(name, ZoneKind::Forward)
    }

    /// Construct a reverse zone, working out the address family from
    /// the name.
    ///
    /// # Errors
    ///
    /// If the name is not under `in-addr.arpa` or `ip6.arpa`.
    pub fn reverse(name: &str) -> Result<Self, Error> {
        let mut fqdn = name.trim().to_string();
        if !fqdn.ends_with('.') {
            fqdn.push('.');
        }

        if is_under(&fqdn, IPV4_REVERSE_SUFFIX) {
            Self::new(name, ZoneKind::ReverseV4)
        } else if is_under(&fqdn, IPV6_REVERSE_SUFFIX) {
            Self::new(name, ZoneKind::ReverseV6)
        } else {
            Err(Error::validation(
                "zone name",
                &format!("'{fqdn}' is not under {IPV4_REVERSE_SUFFIX} or {IPV6_REVERSE_SUFFIX}"),
            ))
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    /// The SOA record, if there is one.
    pub fn soa(&self) -> Option<&ResourceRecord> {
        self.soa.as_ref()
    }

    /// The non-SOA records, in insertion order.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// # Errors
    ///
    /// If the TTL is above `MAX_TTL`.
    pub fn set_default_ttl(&mut self, ttl: u32) -> Result<(), Error> {
        validate_ttl(Some(ttl))?;
        self.default_ttl = ttl;
        Ok(())
    }

    pub fn set_serial_policy(&mut self, policy: SerialPolicy) {
        self.serial_policy = policy;
    }

    /// Add a record.  A SOA record replaces any existing one; anything
    /// else is appended.
    pub fn add_record(&mut self, record: ResourceRecord) {
        if record.rtype() == RecordType::SOA {
            self.soa = Some(record);
        } else {
            self.records.push(record);
        }
    }

    /// Set the SOA record at the apex, replacing any existing one.
    ///
    /// `contact` may be given as an e-mail address (`hostmaster@example.com`),
    /// which is converted to domain name form.
    ///
    /// # Errors
    ///
    /// If a name is empty or contains whitespace, or the TTL is too
    /// large.
    pub fn add_soa(&mut self, primary_ns: &str, contact: &str, soa: Soa) -> Result<(), Error> {
        self.add_soa_at(APEX, primary_ns, contact, soa)
    }

    /// As `add_soa`, but owned by `name` rather than the apex.
    ///
    /// # Errors
    ///
    /// As `add_soa`.
    pub fn add_soa_at(
        &mut self,
        name: &str,
        primary_ns: &str,
        contact: &str,
        soa: Soa,
    ) -> Result<(), Error> {
        let serial = match soa.serial {
            Some(serial) => serial,
            None => self.serial_policy.serial(),
        };
        let record = ResourceRecord::new(
            name,
            RecordData::SOA {
                mname: primary_ns.to_string(),
                rname: mailbox_name(contact)?,
                serial,
                refresh: soa.refresh,
                retry: soa.retry,
                expire: soa.expire,
                minimum: soa.minimum,
            },
        )?
        .with_ttl(soa.ttl)?;

        self.soa = Some(record);
        Ok(())
    }

    pub fn add_ns(&mut self, name_server: &str, name: &str, ttl: Option<u32>) -> Result<(), Error> {
        self.push(ResourceRecord::ns(name, name_server)?, ttl)
    }

    pub fn add_a(&mut self, address: &str, name: &str, ttl: Option<u32>) -> Result<(), Error> {
        self.push(ResourceRecord::a(name, address)?, ttl)
    }

    pub fn add_aaaa(&mut self, address: &str, name: &str, ttl: Option<u32>) -> Result<(), Error> {
        self.push(ResourceRecord::aaaa(name, address)?, ttl)
    }

    pub fn add_mx(
        &mut self,
        exchange: &str,
        preference: u16,
        name: &str,
        ttl: Option<u32>,
    ) -> Result<(), Error> {
        self.push(ResourceRecord::mx(name, preference, exchange)?, ttl)
    }

    pub fn add_txt(&mut self, text: &str, name: &str, ttl: Option<u32>) -> Result<(), Error> {
        self.push(ResourceRecord::txt(name, text)?, ttl)
    }

    pub fn add_cname(
        &mut self,
        canonical_name: &str,
        name: &str,
        ttl: Option<u32>,
    ) -> Result<(), Error> {
        self.push(ResourceRecord::cname(name, canonical_name)?, ttl)
    }

    /// Add a PTR record for `address`, owned by its reverse-lookup
    /// name.
    ///
    /// # Errors
    ///
    /// If the address is malformed, if this is a forward zone, or if
    /// the address family does not match the zone.
    pub fn add_ptr(&mut self, address: &str, target: &str, ttl: Option<u32>) -> Result<(), Error> {
        let record = self.ptr_record(address, target)?;
        self.push(record, ttl)
    }

    /// Build, but do not add, a PTR record which belongs in this zone.
    ///
    /// # Errors
    ///
    /// As `add_ptr`.
    pub fn ptr_record(&self, address: &str, target: &str) -> Result<ResourceRecord, Error> {
        let parsed = parse_address(address)?;
        match (self.kind, parsed) {
            (ZoneKind::Forward, _) => {
                return Err(Error::validation(
                    "zone",
                    &format!("cannot add PTR record to forward zone '{}'", self.origin),
                ))
            }
            (ZoneKind::ReverseV4, IpAddr::V6(_)) | (ZoneKind::ReverseV6, IpAddr::V4(_)) => {
                return Err(Error::validation(
                    "address",
                    &format!("'{address}' does not belong in zone '{}'", self.origin),
                ))
            }
            _ => (),
        }

        ResourceRecord::new(
            &reverse_name_of(parsed),
            RecordData::PTR {
                ptrdname: target.to_string(),
            },
        )
    }

    fn push(&mut self, record: ResourceRecord, ttl: Option<u32>) -> Result<(), Error> {
        self.records.push(record.with_ttl(ttl)?);
        Ok(())
    }
}

/// Convert an e-mail address into the domain name form used in SOA
/// records: `john.doe@example.com` becomes `john\.doe.example.com.`.
/// Anything without an `@` is assumed to be in that form already.
///
/// # Errors
///
/// If there is nothing after the `@`.
pub fn mailbox_name(contact: &str) -> Result<String, Error> {
    let contact = contact.trim();
    match contact.split_once('@') {
        Some((local, domain)) => {
            if local.is_empty() || domain.is_empty() {
                return Err(Error::validation(
                    "contact",
                    &format!("'{contact}' is not a valid e-mail address"),
                ));
            }
            let mut out = local.replace('.', "\\.");
            out.push('.');
            out.push_str(domain);
            if !out.ends_with('.') {
                out.push('.');
            }
            Ok(out)
        }
        None => Ok(contact.to_string()),
    }
}

/// Names must be present and must not break the line-oriented output.
pub(crate) fn validate_name(field: &str, name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        Err(Error::validation(field, "must not be empty"))
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Err(Error::validation(
            field,
            &format!("'{name}' contains whitespace or control characters"),
        ))
    } else {
        Ok(name.to_string())
    }
}

fn validate_ttl(ttl: Option<u32>) -> Result<Option<u32>, Error> {
    match ttl {
        Some(ttl) if ttl > MAX_TTL => Err(Error::validation(
            "ttl",
            &format!("{ttl} is larger than {MAX_TTL}"),
        )),
        _ => Ok(ttl),
    }
}

/// Case-insensitive check that `fqdn` is `suffix` or a name below it.
fn is_under(fqdn: &str, suffix: &str) -> bool {
    let fqdn = fqdn.to_ascii_lowercase();
    fqdn == suffix || fqdn.ends_with(&format!(".{suffix}"))
}
