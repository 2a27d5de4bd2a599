// SPDX-License-Identifier: MIT
//! Word pools for the default memorable-name generator.
//!
//! ~250 entries each, grouped loosely by theme for ease of review — the
//! grouping has no effect on selection, which is uniform over the flat list.

pub const ADJECTIVES: &[&str] = &[
    // colors / visual
    "amber", "azure", "crimson", "emerald", "golden", "indigo", "ivory", "jade", "lilac",
    "magenta", "maroon", "olive", "onyx", "opal", "pearl", "rosy", "ruby", "russet", "sepia",
    "silver", "slate", "tawny", "teal", "vermilion", "violet", "copper", "bronze", "charcoal",
    "cobalt", "coral",
    // textures / materials
    "brisk", "brittle", "burnished", "crisp", "dappled", "downy", "dusty", "feathery", "flinty",
    "frosted", "glassy", "granular", "gritty", "hollow", "leathery", "mossy", "polished",
    "powdery", "rugged", "satin", "sleek", "smoky", "sooty", "supple", "velvet", "weathered",
    "woven", "worn", "waxed", "brushed",
    // weather / nature
    "arid", "autumnal", "balmy", "blustery", "breezy", "clear", "cloudy", "cool", "dewy", "foggy",
    "frosty", "gusty", "humid", "icy", "misty", "monsoon", "overcast", "radiant", "rainy",
    "snowy", "sultry", "sunny", "temperate", "tidal", "tropical", "vernal", "wintry", "windy",
    "stormy", "hazy",
    // character / mood
    "affable", "agile", "alert", "ample", "ardent", "avid", "bold", "brave", "bright", "calm",
    "canny", "careful", "clever", "cordial", "curious", "daring", "deft", "devoted", "diligent",
    "earnest", "eager", "even", "fair", "faithful", "fervent", "frank", "gallant", "genial",
    "gentle", "genuine",
    // size / shape
    "ample", "brief", "compact", "dense", "gaunt", "lanky", "lean", "lithe", "narrow", "nimble",
    "oblong", "slender", "slight", "spare", "sprawling", "squat", "stout", "sturdy", "supple",
    "wiry", "broad", "deep", "long", "low", "shallow", "short", "small", "tall", "thin", "wide",
    // temperament / pace
    "brisk", "buoyant", "calm", "candid", "capable", "capricious", "composed", "crafty",
    "dauntless", "decisive", "diplomatic", "discreet", "earnest", "easygoing", "effusive",
    "enterprising", "even-tempered", "exuberant", "forthright", "frugal", "game", "genial",
    "gracious", "humble", "imaginative", "industrious", "jovial", "keen", "level", "loyal",
    // miscellaneous
    "amber", "ancient", "artful", "auburn", "autonomous", "avid", "brief", "canny", "chipper",
    "deft", "eager", "electric", "fleet", "frugal", "hardy", "humble", "lucid", "nimble", "placid",
    "quiet", "rapid", "serene", "sober", "spry", "steady", "subtle", "swift", "tidy", "tranquil",
    "vivid",
];

pub const NOUNS: &[&str] = &[
    // animals
    "badger", "beaver", "bison", "condor", "cormorant", "coyote", "crane", "egret", "falcon",
    "ferret", "finch", "fox", "gazelle", "heron", "ibis", "jackal", "kestrel", "lemur", "lynx",
    "magpie", "marmot", "marten", "mink", "moose", "newt", "osprey", "otter", "owl", "panther",
    "plover",
    "puffin", "quail", "raven", "sable", "seal", "shrike", "skink", "sparrow", "swift", "tern",
    "vole", "weasel", "wolverine", "wren", "yak", "antelope", "bobcat", "caribou", "dingo",
    "elk",
    // plants
    "acacia", "alder", "aspen", "birch", "cedar", "clover", "cypress", "elder", "fern", "fir",
    "hazel", "hemlock", "holly", "ivy", "juniper", "laurel", "larch", "linden", "maple", "oak",
    "pine", "poplar", "rowan", "rush", "sage", "sedge", "spruce", "sumac", "thistle", "willow",
    // landscape / geography
    "atoll", "basin", "bay", "bluff", "brook", "canyon", "cave", "cliff", "cove", "creek", "delta",
    "dune", "estuary", "fjord", "glacier", "glade", "glen", "gorge", "grotto", "harbor", "headland",
    "highland", "inlet", "isle", "knoll", "lagoon", "marsh", "meadow", "mesa", "moor",
    // sky / celestial
    "aurora", "comet", "constellation", "dawn", "dusk", "eclipse", "horizon", "meteor", "moon",
    "nebula", "nova", "orbit", "solstice", "star", "tide", "twilight", "zenith", "zephyr",
    "cosmos", "galaxy",
    // objects / tools
    "anchor", "anvil", "beacon", "bellows", "bridge", "chisel", "compass", "ember", "forge",
    "gate", "hearth", "helm", "kiln", "ladle", "lantern", "loom", "mast", "mill", "oar", "prism",
    "quill", "rudder", "satchel", "spindle", "tinder", "trowel", "vessel", "wheel", "whetstone",
    "yardarm",
    // abstract / qualities
    "cadence", "candor", "current", "drift", "echo", "ember", "flicker", "glimmer", "harbor",
    "haven", "journey", "lattice", "legacy", "lumen", "momentum", "pulse", "rapport", "refuge",
    "resolve", "ripple", "signal", "solace", "spark", "stride", "summit", "tether", "threshold",
    "vantage", "vista", "wake",
];
