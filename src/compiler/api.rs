//! Built-in API surface injected ahead of user sources.
//!
//! These declarations exist so calls against the GLSL environment type-check;
//! every symbol parsed from this source is flagged imported and stripped
//! from emitted output. The derivative and LOD functions are gated behind
//! their extensions by the resolver.

/// Synthetic source name used for diagnostics pointing into this text.
pub const NAME: &str = "<api>";

pub const SOURCE: &str = r#"
vec4 gl_Position;
float gl_PointSize;
vec4 gl_FragColor;
vec4 gl_FragCoord;
vec2 gl_PointCoord;
bool gl_FrontFacing;

float radians(float degrees); vec2 radians(vec2 degrees); vec3 radians(vec3 degrees); vec4 radians(vec4 degrees);
float degrees(float radians); vec2 degrees(vec2 radians); vec3 degrees(vec3 radians); vec4 degrees(vec4 radians);
float sin(float angle); vec2 sin(vec2 angle); vec3 sin(vec3 angle); vec4 sin(vec4 angle);
float cos(float angle); vec2 cos(vec2 angle); vec3 cos(vec3 angle); vec4 cos(vec4 angle);
float tan(float angle); vec2 tan(vec2 angle); vec3 tan(vec3 angle); vec4 tan(vec4 angle);
float asin(float x); vec2 asin(vec2 x); vec3 asin(vec3 x); vec4 asin(vec4 x);
float acos(float x); vec2 acos(vec2 x); vec3 acos(vec3 x); vec4 acos(vec4 x);
float atan(float y, float x); vec2 atan(vec2 y, vec2 x); vec3 atan(vec3 y, vec3 x); vec4 atan(vec4 y, vec4 x);
float atan(float y_over_x); vec2 atan(vec2 y_over_x); vec3 atan(vec3 y_over_x); vec4 atan(vec4 y_over_x);

float pow(float x, float y); vec2 pow(vec2 x, vec2 y); vec3 pow(vec3 x, vec3 y); vec4 pow(vec4 x, vec4 y);
float exp(float x); vec2 exp(vec2 x); vec3 exp(vec3 x); vec4 exp(vec4 x);
float log(float x); vec2 log(vec2 x); vec3 log(vec3 x); vec4 log(vec4 x);
float exp2(float x); vec2 exp2(vec2 x); vec3 exp2(vec3 x); vec4 exp2(vec4 x);
float log2(float x); vec2 log2(vec2 x); vec3 log2(vec3 x); vec4 log2(vec4 x);
float sqrt(float x); vec2 sqrt(vec2 x); vec3 sqrt(vec3 x); vec4 sqrt(vec4 x);
float inversesqrt(float x); vec2 inversesqrt(vec2 x); vec3 inversesqrt(vec3 x); vec4 inversesqrt(vec4 x);

float abs(float x); vec2 abs(vec2 x); vec3 abs(vec3 x); vec4 abs(vec4 x);
float sign(float x); vec2 sign(vec2 x); vec3 sign(vec3 x); vec4 sign(vec4 x);
float floor(float x); vec2 floor(vec2 x); vec3 floor(vec3 x); vec4 floor(vec4 x);
float ceil(float x); vec2 ceil(vec2 x); vec3 ceil(vec3 x); vec4 ceil(vec4 x);
float fract(float x); vec2 fract(vec2 x); vec3 fract(vec3 x); vec4 fract(vec4 x);
float mod(float x, float y); vec2 mod(vec2 x, vec2 y); vec3 mod(vec3 x, vec3 y); vec4 mod(vec4 x, vec4 y);
vec2 mod(vec2 x, float y); vec3 mod(vec3 x, float y); vec4 mod(vec4 x, float y);
float min(float x, float y); vec2 min(vec2 x, vec2 y); vec3 min(vec3 x, vec3 y); vec4 min(vec4 x, vec4 y);
vec2 min(vec2 x, float y); vec3 min(vec3 x, float y); vec4 min(vec4 x, float y);
float max(float x, float y); vec2 max(vec2 x, vec2 y); vec3 max(vec3 x, vec3 y); vec4 max(vec4 x, vec4 y);
vec2 max(vec2 x, float y); vec3 max(vec3 x, float y); vec4 max(vec4 x, float y);
float clamp(float x, float lo, float hi); vec2 clamp(vec2 x, vec2 lo, vec2 hi); vec3 clamp(vec3 x, vec3 lo, vec3 hi); vec4 clamp(vec4 x, vec4 lo, vec4 hi);
vec2 clamp(vec2 x, float lo, float hi); vec3 clamp(vec3 x, float lo, float hi); vec4 clamp(vec4 x, float lo, float hi);
float mix(float x, float y, float a); vec2 mix(vec2 x, vec2 y, vec2 a); vec3 mix(vec3 x, vec3 y, vec3 a); vec4 mix(vec4 x, vec4 y, vec4 a);
vec2 mix(vec2 x, vec2 y, float a); vec3 mix(vec3 x, vec3 y, float a); vec4 mix(vec4 x, vec4 y, float a);
float step(float edge, float x); vec2 step(vec2 edge, vec2 x); vec3 step(vec3 edge, vec3 x); vec4 step(vec4 edge, vec4 x);
vec2 step(float edge, vec2 x); vec3 step(float edge, vec3 x); vec4 step(float edge, vec4 x);
float smoothstep(float lo, float hi, float x); vec2 smoothstep(vec2 lo, vec2 hi, vec2 x); vec3 smoothstep(vec3 lo, vec3 hi, vec3 x); vec4 smoothstep(vec4 lo, vec4 hi, vec4 x);
vec2 smoothstep(float lo, float hi, vec2 x); vec3 smoothstep(float lo, float hi, vec3 x); vec4 smoothstep(float lo, float hi, vec4 x);

float length(float x); float length(vec2 x); float length(vec3 x); float length(vec4 x);
float distance(float a, float b); float distance(vec2 a, vec2 b); float distance(vec3 a, vec3 b); float distance(vec4 a, vec4 b);
float dot(float a, float b); float dot(vec2 a, vec2 b); float dot(vec3 a, vec3 b); float dot(vec4 a, vec4 b);
vec3 cross(vec3 a, vec3 b);
float normalize(float x); vec2 normalize(vec2 x); vec3 normalize(vec3 x); vec4 normalize(vec4 x);
float faceforward(float n, float i, float nref); vec2 faceforward(vec2 n, vec2 i, vec2 nref); vec3 faceforward(vec3 n, vec3 i, vec3 nref); vec4 faceforward(vec4 n, vec4 i, vec4 nref);
float reflect(float i, float n); vec2 reflect(vec2 i, vec2 n); vec3 reflect(vec3 i, vec3 n); vec4 reflect(vec4 i, vec4 n);
float refract(float i, float n, float eta); vec2 refract(vec2 i, vec2 n, float eta); vec3 refract(vec3 i, vec3 n, float eta); vec4 refract(vec4 i, vec4 n, float eta);
mat2 matrixCompMult(mat2 a, mat2 b); mat3 matrixCompMult(mat3 a, mat3 b); mat4 matrixCompMult(mat4 a, mat4 b);

vec4 texture2D(sampler2D sampler, vec2 coord);
vec4 texture2D(sampler2D sampler, vec2 coord, float bias);
vec4 texture2DProj(sampler2D sampler, vec3 coord);
vec4 texture2DProj(sampler2D sampler, vec4 coord);
vec4 textureCube(samplerCube sampler, vec3 coord);
vec4 textureCube(samplerCube sampler, vec3 coord, float bias);
vec4 texture2DLodEXT(sampler2D sampler, vec2 coord, float lod);
vec4 textureCubeLodEXT(samplerCube sampler, vec3 coord, float lod);

float dFdx(float p); vec2 dFdx(vec2 p); vec3 dFdx(vec3 p); vec4 dFdx(vec4 p);
float dFdy(float p); vec2 dFdy(vec2 p); vec3 dFdy(vec3 p); vec4 dFdy(vec4 p);
float fwidth(float p); vec2 fwidth(vec2 p); vec3 fwidth(vec3 p); vec4 fwidth(vec4 p);
"#;
