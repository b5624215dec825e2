// cpx-common/src/dependency/builtin.rs
use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Names that are never resolved regardless of the core module list.
const ALWAYS_IGNORED: &[&str] = &["perl"];

/// Pragmas and modules shipped with every supported perl.
const CORE_MODULES: &[&str] = &[
    // pragmas
    "attributes", "autodie", "autouse", "base", "bigint", "bignum", "bigrat", "blib",
    "bytes", "charnames", "constant", "deprecate", "diagnostics", "encoding", "experimental",
    "feature", "fields", "filetest", "if", "integer", "less", "lib", "locale", "mro", "open",
    "ops", "overload", "overloading", "parent", "re", "sigtrap", "sort", "strict", "subs",
    "threads", "threads::shared", "utf8", "vars", "version", "vmsish", "warnings",
    "warnings::register",
    // modules
    "AnyDBM_File", "App::Prove", "Archive::Tar", "Attribute::Handlers", "AutoLoader",
    "AutoSplit", "B", "B::Deparse", "Benchmark", "CPAN", "CPAN::Meta",
    "CPAN::Meta::Requirements", "CPAN::Meta::YAML", "Carp", "Carp::Heavy", "Class::Struct",
    "Compress::Raw::Bzip2", "Compress::Raw::Zlib", "Compress::Zlib", "Config",
    "Config::Extensions", "Cwd", "DB", "DBM_Filter", "DB_File", "Data::Dumper",
    "Devel::Peek", "Devel::PPPort", "Devel::SelfStubber", "Digest", "Digest::MD5",
    "Digest::SHA", "DirHandle", "Dumpvalue", "DynaLoader", "Encode", "Encode::Alias",
    "Encode::Guess", "English", "Env", "Errno", "Exporter", "Exporter::Heavy",
    "ExtUtils::CBuilder", "ExtUtils::Command", "ExtUtils::Constant", "ExtUtils::Embed",
    "ExtUtils::Install", "ExtUtils::Installed", "ExtUtils::Liblist", "ExtUtils::MM",
    "ExtUtils::MY", "ExtUtils::MakeMaker", "ExtUtils::Manifest", "ExtUtils::Miniperl",
    "ExtUtils::Mkbootstrap", "ExtUtils::Mksymlists", "ExtUtils::Packlist",
    "ExtUtils::ParseXS", "ExtUtils::Typemaps", "Fatal", "Fcntl", "File::Basename",
    "File::Compare", "File::Copy", "File::DosGlob", "File::Fetch", "File::Find",
    "File::Glob", "File::GlobMapper", "File::Path", "File::Spec", "File::Spec::Functions",
    "File::Spec::Unix", "File::Temp", "File::stat", "FileCache", "FileHandle",
    "Filter::Simple", "Filter::Util::Call", "FindBin", "GDBM_File", "Getopt::Long",
    "Getopt::Std", "HTTP::Tiny", "Hash::Util", "Hash::Util::FieldHash", "I18N::Collate",
    "I18N::LangTags", "I18N::Langinfo", "IO", "IO::Compress::Base", "IO::Compress::Gzip",
    "IO::Dir", "IO::File", "IO::Handle", "IO::Pipe", "IO::Poll", "IO::Seekable",
    "IO::Select", "IO::Socket", "IO::Socket::INET", "IO::Socket::IP", "IO::Socket::UNIX",
    "IO::Uncompress::Base", "IO::Uncompress::Gunzip", "IO::Zlib", "IPC::Cmd", "IPC::Msg",
    "IPC::Open2", "IPC::Open3", "IPC::Semaphore", "IPC::SharedMem", "IPC::SysV",
    "JSON::PP", "JSON::PP::Boolean", "List::Util", "List::Util::XS", "Locale::Maketext",
    "Locale::Maketext::Simple", "MIME::Base64", "MIME::QuotedPrint", "Math::BigFloat",
    "Math::BigInt", "Math::BigInt::Calc", "Math::BigRat", "Math::Complex", "Math::Trig",
    "Memoize", "Module::CoreList", "Module::Load", "Module::Load::Conditional",
    "Module::Loaded", "Module::Metadata", "NDBM_File", "NEXT", "Net::Cmd", "Net::Config",
    "Net::Domain", "Net::FTP", "Net::Ping", "Net::SMTP", "Net::hostent", "ODBM_File",
    "Opcode", "POSIX", "Params::Check", "Parse::CPAN::Meta", "Perl::OSType", "PerlIO",
    "PerlIO::encoding", "PerlIO::scalar", "PerlIO::via", "PerlIO::via::QuotedPrint",
    "Pod::Checker", "Pod::Escapes", "Pod::Html", "Pod::Man", "Pod::Simple", "Pod::Text",
    "Pod::Usage", "SDBM_File", "Safe", "Scalar::Util", "Search::Dict", "SelectSaver",
    "SelfLoader", "Socket", "Storable", "Sub::Util", "Symbol", "Sys::Hostname",
    "Sys::Syslog", "TAP::Harness", "Term::ANSIColor", "Term::Cap", "Term::Complete",
    "Term::ReadLine", "Test", "Test::Builder", "Test::Builder::Module", "Test::Harness",
    "Test::More", "Test::Simple", "Test2", "Test2::API", "Text::Abbrev",
    "Text::Balanced", "Text::ParseWords", "Text::Tabs", "Text::Wrap", "Thread",
    "Thread::Queue", "Thread::Semaphore", "Tie::Array", "Tie::File", "Tie::Handle",
    "Tie::Hash", "Tie::Hash::NamedCapture", "Tie::Memoize", "Tie::RefHash", "Tie::Scalar",
    "Tie::StdHandle", "Tie::SubstrHash", "Time::HiRes", "Time::Local", "Time::Piece",
    "Time::Seconds", "Time::gmtime", "Time::localtime", "Time::tm", "UNIVERSAL",
    "Unicode::Collate", "Unicode::Normalize", "Unicode::UCD", "User::grent",
    "User::pwent", "XSLoader",
];

static CORE_MODULE_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| CORE_MODULES.iter().copied().collect());

/// Decides which requirement names are part of the perl distribution itself
/// (or explicitly ignored) and therefore never resolved or installed.
#[derive(Debug, Clone)]
pub struct BuiltinFilter {
    ignored: HashSet<String>,
}

impl BuiltinFilter {
    pub fn new() -> Self {
        Self {
            ignored: ALWAYS_IGNORED.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_ignores<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::new();
        filter.ignored.extend(extra.into_iter().map(Into::into));
        filter
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    pub fn is_core(&self, name: &str) -> bool {
        CORE_MODULE_SET.contains(name)
    }

    pub fn should_skip(&self, name: &str) -> bool {
        self.is_ignored(name) || self.is_core(name)
    }
}

impl Default for BuiltinFilter {
    fn default() -> Self {
        Self::new()
    }
}
