/// User agent string for HTTP requests
pub const USER_AGENT: &str = "mcp-crop-advisor/0.1.0";

/// NASA POWER daily point API base URL
pub const NASA_POWER_API_BASE: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";

/// OpenCage geocoding API base URL
pub const OPENCAGE_API_BASE: &str = "https://api.opencagedata.com/geocode/v1/json";

/// Parameters requested from NASA POWER for every location
pub const NASA_POWER_PARAMETERS: &str = "T2M,PRECTOTCORR,RH2M,WS2M,ALLSKY_SFC_SW_DWN,T2M_MAX,T2M_MIN,PS,QV10M,SNODP,TS,U10M,U2M,U50M,V10M,V2M,PSC,WD10M,WD2M,WS10M";

/// NASA POWER community whose units the parameters are reported in
pub const NASA_POWER_COMMUNITY: &str = "AG";

/// Value NASA POWER uses for days it has no measurement for
pub const NASA_POWER_FILL_VALUE: f64 = -999.0;

/// Date format used by NASA POWER request parameters and response keys
pub const POWER_DATE_FORMAT: &str = "%Y%m%d";

/// Mean temperature (°C) at or above which a day counts as favorable
pub const FAVORABLE_TEMPERATURE_THRESHOLD: f64 = 20.0;

/// Minimum number of canonical features needed to train or infer
pub const MIN_FEATURES: usize = 2;

/// Minimum number of usable records needed to fit a classifier
pub const MIN_TRAINING_RECORDS: usize = 2;

/// Fraction of usable records held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the train/test partition and the forest's bootstrap draws
pub const RANDOM_SEED: u64 = 42;

/// Number of trees in the forest
pub const N_ESTIMATORS: usize = 100;

/// Conversion factor from metres per second to kilometres per hour
pub const MS_TO_KMH: f64 = 3.6;
